//! Retry-with-backoff wrapper around any analyzer.
//!
//! Only errors reporting [`kvar_core::AnalysisError::is_retryable`] are retried; a
//! malformed payload or a rejected request fails immediately so the triage
//! fallback chain can move on.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use kvar_core::{
    defaults, AnalysisResult, RawClassification, TextAnalysisRequest, TextAnalyzer,
    VisionAnalysisRequest, VisionAnalyzer,
};

/// Retry policy: `max_retries` extra attempts, backoff doubling each time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: defaults::ANALYZE_MAX_RETRIES,
            initial_backoff: Duration::from_millis(defaults::ANALYZE_INITIAL_BACKOFF_MS),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::ZERO,
        }
    }

    /// Worst-case wall time of one invocation when every attempt takes
    /// `per_attempt`: all attempts plus every backoff sleep.
    pub fn budget(&self, per_attempt: Duration) -> Duration {
        let mut total = per_attempt.saturating_mul(self.max_retries.saturating_add(1));
        let mut backoff = self.initial_backoff;
        for _ in 0..self.max_retries {
            total = total.saturating_add(backoff);
            backoff = backoff.saturating_mul(2);
        }
        total
    }

    /// Run `call` until it succeeds, fails permanently, or retries run out.
    pub async fn run<F, Fut>(
        &self,
        op: &'static str,
        mut call: F,
    ) -> AnalysisResult<RawClassification>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AnalysisResult<RawClassification>>,
    {
        let mut attempt = 0u32;
        let mut backoff = self.initial_backoff;
        loop {
            match call().await {
                Ok(raw) => return Ok(raw),
                Err(e) if attempt < self.max_retries && e.is_retryable() => {
                    attempt += 1;
                    warn!(
                        op,
                        attempt,
                        error = %e,
                        "Transient analyzer failure, retrying in {:?}",
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Analyzer decorator applying a [`RetryPolicy`].
pub struct RetryingAnalyzer<A> {
    inner: A,
    policy: RetryPolicy,
}

impl<A> RetryingAnalyzer<A> {
    pub fn new(inner: A, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }
}

#[async_trait]
impl<A: TextAnalyzer> TextAnalyzer for RetryingAnalyzer<A> {
    async fn analyze_text(
        &self,
        request: &TextAnalysisRequest,
    ) -> AnalysisResult<RawClassification> {
        self.policy
            .run("analyze_text", || self.inner.analyze_text(request))
            .await
    }

    async fn health_check(&self) -> AnalysisResult<bool> {
        TextAnalyzer::health_check(&self.inner).await
    }

    fn model_name(&self) -> &str {
        TextAnalyzer::model_name(&self.inner)
    }
}

#[async_trait]
impl<A: VisionAnalyzer> VisionAnalyzer for RetryingAnalyzer<A> {
    async fn analyze_images(
        &self,
        request: &VisionAnalysisRequest<'_>,
    ) -> AnalysisResult<RawClassification> {
        self.policy
            .run("analyze_images", || self.inner.analyze_images(request))
            .await
    }

    async fn health_check(&self) -> AnalysisResult<bool> {
        VisionAnalyzer::health_check(&self.inner).await
    }

    fn model_name(&self) -> &str {
        VisionAnalyzer::model_name(&self.inner)
    }
}
