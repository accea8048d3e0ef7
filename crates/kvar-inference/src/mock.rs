//! Mock analyzers for deterministic testing.
//!
//! Both mocks return scripted outcomes (a default plus an optional queue
//! consumed one per call), can simulate latency, and record every invocation
//! into a [`CallLog`]. Sharing one log between a text and a vision mock gives
//! the order in which a coordinator invoked them.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kvar_core::{AnalysisError, RawClassification, TextAnalysisRequest, TextAnalyzer};
//! use kvar_inference::mock::{CallLog, MockTextAnalyzer};
//!
//! let log = CallLog::new();
//! let text = MockTextAnalyzer::new()
//!     .with_call_log(log.clone())
//!     .with_response(RawClassification {
//!         category: "Dizalo".to_string(),
//!         ..Default::default()
//!     })
//!     .then_fail(AnalysisError::Transport("connection refused".into()));
//!
//! let req = TextAnalysisRequest::new("Dizalo stoji između katova");
//! assert!(text.analyze_text(&req).await.is_err());
//! assert_eq!(text.analyze_text(&req).await.unwrap().category, "Dizalo");
//! assert_eq!(log.operations(), vec!["analyze_text", "analyze_text"]);
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use kvar_core::{
    AnalysisError, AnalysisResult, RawClassification, TextAnalysisRequest, TextAnalyzer,
    VisionAnalysisRequest, VisionAnalyzer,
};

/// Operation name recorded for text calls.
pub const OP_ANALYZE_TEXT: &str = "analyze_text";

/// Operation name recorded for vision calls.
pub const OP_ANALYZE_IMAGES: &str = "analyze_images";

/// One recorded analyzer invocation.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub operation: &'static str,
    pub model: String,
    /// Text passed to the analyzer.
    pub input: String,
    pub room_hint: Option<String>,
    pub image_count: usize,
    pub timestamp: Instant,
}

/// Shared, ordered record of mock invocations.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<MockCall>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<MockCall>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, call: MockCall) {
        self.lock().push(call);
    }

    /// Get all logged calls for assertion.
    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().clone()
    }

    /// Operation names in invocation order.
    pub fn operations(&self) -> Vec<&'static str> {
        self.lock().iter().map(|c| c.operation).collect()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.lock().iter().filter(|c| c.operation == operation).count()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear()
    }
}

#[derive(Debug, Clone)]
struct MockConfig {
    model: String,
    default_outcome: AnalysisResult<RawClassification>,
    latency_ms: u64,
}

/// Scripted behaviour shared by both mocks.
#[derive(Debug, Clone)]
struct MockScript {
    config: Arc<MockConfig>,
    queue: Arc<Mutex<VecDeque<AnalysisResult<RawClassification>>>>,
    call_log: CallLog,
    healthy: bool,
}

impl MockScript {
    fn new(model: &str) -> Self {
        Self {
            config: Arc::new(MockConfig {
                model: model.to_string(),
                default_outcome: Ok(default_classification()),
                latency_ms: 0,
            }),
            queue: Arc::new(Mutex::new(VecDeque::new())),
            call_log: CallLog::new(),
            healthy: true,
        }
    }

    fn push(&self, outcome: AnalysisResult<RawClassification>) {
        self.queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(outcome);
    }

    fn next_outcome(&self) -> AnalysisResult<RawClassification> {
        let queued = self
            .queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();
        queued.unwrap_or_else(|| self.config.default_outcome.clone())
    }

    async fn run(
        &self,
        operation: &'static str,
        input: &str,
        room_hint: Option<&str>,
        image_count: usize,
    ) -> AnalysisResult<RawClassification> {
        self.call_log.record(MockCall {
            operation,
            model: self.config.model.clone(),
            input: input.to_string(),
            room_hint: room_hint.map(str::to_string),
            image_count,
            timestamp: Instant::now(),
        });
        if self.config.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.latency_ms)).await;
        }
        self.next_outcome()
    }
}

fn default_classification() -> RawClassification {
    RawClassification {
        category: "Other".to_string(),
        priority: Some("medium".to_string()),
        confidence: Some(0.5),
        reasoning: Some("Mock classification.".to_string()),
        room: Some("Other".to_string()),
        ..Default::default()
    }
}

macro_rules! mock_builders {
    ($ty:ident) => {
        impl $ty {
            /// Record calls into a shared log.
            pub fn with_call_log(mut self, log: CallLog) -> Self {
                self.script.call_log = log;
                self
            }

            pub fn with_model(mut self, model: impl Into<String>) -> Self {
                Arc::make_mut(&mut self.script.config).model = model.into();
                self
            }

            /// Outcome returned whenever the queue is empty.
            pub fn with_response(mut self, raw: RawClassification) -> Self {
                Arc::make_mut(&mut self.script.config).default_outcome = Ok(raw);
                self
            }

            /// Fail every call whose outcome is not queued.
            pub fn with_failure(mut self, error: AnalysisError) -> Self {
                Arc::make_mut(&mut self.script.config).default_outcome = Err(error);
                self
            }

            /// Set simulated latency for every call.
            pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
                Arc::make_mut(&mut self.script.config).latency_ms = latency_ms;
                self
            }

            pub fn with_health(mut self, healthy: bool) -> Self {
                self.script.healthy = healthy;
                self
            }

            /// Queue a one-shot success.
            pub fn then_respond(self, raw: RawClassification) -> Self {
                self.script.push(Ok(raw));
                self
            }

            /// Queue a one-shot failure.
            pub fn then_fail(self, error: AnalysisError) -> Self {
                self.script.push(Err(error));
                self
            }

            pub fn call_log(&self) -> &CallLog {
                &self.script.call_log
            }

            /// Get all logged calls for assertion.
            pub fn get_calls(&self) -> Vec<MockCall> {
                self.script.call_log.calls()
            }
        }
    };
}

/// Mock text analyzer.
#[derive(Debug, Clone)]
pub struct MockTextAnalyzer {
    script: MockScript,
}

impl MockTextAnalyzer {
    pub fn new() -> Self {
        Self {
            script: MockScript::new("mock-text"),
        }
    }

    /// Number of text calls made through this mock's log.
    pub fn call_count(&self) -> usize {
        self.script.call_log.count(OP_ANALYZE_TEXT)
    }
}

impl Default for MockTextAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

mock_builders!(MockTextAnalyzer);

#[async_trait]
impl TextAnalyzer for MockTextAnalyzer {
    async fn analyze_text(
        &self,
        request: &TextAnalysisRequest,
    ) -> AnalysisResult<RawClassification> {
        self.script
            .run(
                OP_ANALYZE_TEXT,
                &request.text,
                request.room_hint.as_deref(),
                0,
            )
            .await
    }

    async fn health_check(&self) -> AnalysisResult<bool> {
        Ok(self.script.healthy)
    }

    fn model_name(&self) -> &str {
        &self.script.config.model
    }
}

/// Mock vision analyzer.
#[derive(Debug, Clone)]
pub struct MockVisionAnalyzer {
    script: MockScript,
}

impl MockVisionAnalyzer {
    pub fn new() -> Self {
        Self {
            script: MockScript::new("mock-vision"),
        }
    }

    /// Number of vision calls made through this mock's log.
    pub fn call_count(&self) -> usize {
        self.script.call_log.count(OP_ANALYZE_IMAGES)
    }
}

impl Default for MockVisionAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

mock_builders!(MockVisionAnalyzer);

#[async_trait]
impl VisionAnalyzer for MockVisionAnalyzer {
    async fn analyze_images(
        &self,
        request: &VisionAnalysisRequest<'_>,
    ) -> AnalysisResult<RawClassification> {
        self.script
            .run(
                OP_ANALYZE_IMAGES,
                request.text,
                request.room_hint,
                request.images.len(),
            )
            .await
    }

    async fn health_check(&self) -> AnalysisResult<bool> {
        Ok(self.script.healthy)
    }

    fn model_name(&self) -> &str {
        &self.script.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvar_core::ImageBlob;

    fn raw(category: &str) -> RawClassification {
        RawClassification {
            category: category.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_default_response() {
        let mock = MockTextAnalyzer::new();
        let result = mock
            .analyze_text(&TextAnalysisRequest::new("x"))
            .await
            .unwrap();
        assert_eq!(result.category, "Other");
        assert_eq!(mock.model_name(), "mock-text");
    }

    #[tokio::test]
    async fn test_queue_consumed_before_default() {
        let mock = MockTextAnalyzer::new()
            .with_response(raw("Podovi"))
            .then_respond(raw("Dizalo"))
            .then_fail(AnalysisError::EmptyPayload);
        let req = TextAnalysisRequest::new("x");

        assert_eq!(mock.analyze_text(&req).await.unwrap().category, "Dizalo");
        assert_eq!(
            mock.analyze_text(&req).await,
            Err(AnalysisError::EmptyPayload)
        );
        assert_eq!(mock.analyze_text(&req).await.unwrap().category, "Podovi");
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_with_failure_applies_to_every_call() {
        let mock = MockVisionAnalyzer::new().with_failure(AnalysisError::Status {
            status: 500,
            body: "boom".into(),
        });
        let images = vec![ImageBlob::new("a.jpg", vec![1u8])];
        let req = VisionAnalysisRequest {
            text: "",
            room_hint: None,
            images: &images,
        };
        assert!(mock.analyze_images(&req).await.is_err());
        assert!(mock.analyze_images(&req).await.is_err());
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_shared_log_records_order() {
        let log = CallLog::new();
        let text = MockTextAnalyzer::new().with_call_log(log.clone());
        let vision = MockVisionAnalyzer::new().with_call_log(log.clone());
        let images = vec![ImageBlob::new("a.jpg", vec![1u8]), ImageBlob::new("b.jpg", vec![2u8])];

        vision
            .analyze_images(&VisionAnalysisRequest {
                text: "Pukla pločica",
                room_hint: Some("Kupaonica"),
                images: &images,
            })
            .await
            .unwrap();
        text.analyze_text(&TextAnalysisRequest::new("Pukla pločica"))
            .await
            .unwrap();

        assert_eq!(log.operations(), vec![OP_ANALYZE_IMAGES, OP_ANALYZE_TEXT]);
        let calls = log.calls();
        assert_eq!(calls[0].image_count, 2);
        assert_eq!(calls[0].room_hint.as_deref(), Some("Kupaonica"));
        assert_eq!(calls[1].input, "Pukla pločica");
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_latency() {
        let mock = MockTextAnalyzer::new().with_latency_ms(2_000);
        let start = tokio::time::Instant::now();
        mock.analyze_text(&TextAnalysisRequest::new("x"))
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(2_000));
    }

    #[tokio::test]
    async fn test_health_flag() {
        let mock = MockTextAnalyzer::new().with_health(false);
        assert!(!mock.health_check().await.unwrap());
    }

    #[test]
    fn test_clones_share_state() {
        let mock = MockTextAnalyzer::new();
        let clone = mock.clone().then_respond(raw("Sigurnost"));
        assert_eq!(mock.script.next_outcome().unwrap().category, "Sigurnost");
        drop(clone);
        assert!(mock.call_log().is_empty());
    }
}
