//! Triage coordinator: analysis path selection and the fallback chain.
//!
//! One call to [`TriageCoordinator::triage`] walks the request through
//! validation, path selection, analysis, and normalization:
//!
//! ```text
//! images + cached description (not forced)   -> text analyzer on text + description
//! images + self-sufficient text (not forced) -> text analyzer on text alone
//! images                                     -> vision analyzer
//! no images                                  -> text analyzer
//! ```
//!
//! Failures never reach the caller. A failed vision call falls back to the
//! text analyzer on the reporter's text, and a failed text call falls back
//! to the deterministic keyword rules. Only invalid input and cancellation
//! are returned as errors.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, field, info, instrument, warn, Span};

use kvar_core::{
    defaults, logging, AnalysisError, AnalysisPath, AnalysisResult, ClassificationRequest,
    Error, RawClassification, Result, TextAnalysisRequest, TextAnalyzer, TriageOutcome,
    VisionAnalysisRequest, VisionAnalyzer,
};
use kvar_inference::Analyzers;

use crate::cache::ImageDescriptionCache;
use crate::config::TriageConfig;
use crate::fallback;
use crate::normalize::{apply_room_hint, normalize, reasoning_leads_with_image};
use crate::specificity::SpecificityConfig;

/// Runs triage requests against injected analyzers.
#[derive(Clone)]
pub struct TriageCoordinator {
    text: Arc<dyn TextAnalyzer>,
    vision: Arc<dyn VisionAnalyzer>,
    specificity: SpecificityConfig,
    confidence_boost: f64,
    analyze_timeout: Duration,
}

impl std::fmt::Debug for TriageCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriageCoordinator")
            .field("text_model", &self.text.model_name())
            .field("vision_model", &self.vision.model_name())
            .field("confidence_boost", &self.confidence_boost)
            .field("analyze_timeout", &self.analyze_timeout)
            .finish()
    }
}

/// Selected branch before any analyzer runs.
#[derive(Debug, Clone, PartialEq)]
enum Plan {
    /// Text analyzer on the given text.
    Text { text: String, path: AnalysisPath },
    /// Vision analyzer on the reporter's text and the images.
    Vision,
}

impl TriageCoordinator {
    pub fn new(text: Arc<dyn TextAnalyzer>, vision: Arc<dyn VisionAnalyzer>) -> Self {
        Self::with_config(text, vision, &TriageConfig::default())
    }

    pub fn with_config(
        text: Arc<dyn TextAnalyzer>,
        vision: Arc<dyn VisionAnalyzer>,
        config: &TriageConfig,
    ) -> Self {
        Self {
            text,
            vision,
            specificity: config.specificity.clone(),
            confidence_boost: config.confidence_boost,
            analyze_timeout: config.analyze_timeout(),
        }
    }

    /// Coordinator over analyzers built from an `AnalyzerConfig`.
    pub fn from_analyzers(analyzers: Analyzers, config: &TriageConfig) -> Self {
        Self::with_config(analyzers.text, analyzers.vision, config)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.analyze_timeout = timeout;
        self
    }

    pub fn specificity(&self) -> &SpecificityConfig {
        &self.specificity
    }

    /// Classify one request.
    ///
    /// `cache` is the caller's image description cache for this draft; it is
    /// only read. Store [`TriageOutcome::derived_image_description`] into it
    /// when the outcome is applied.
    pub async fn triage(
        &self,
        request: &ClassificationRequest,
        cache: &ImageDescriptionCache,
    ) -> Result<TriageOutcome> {
        self.triage_with_cancel(request, cache, &CancellationToken::new())
            .await
    }

    /// Like [`triage`](Self::triage), abandoning in-flight analyzer calls
    /// with [`Error::Cancelled`] once `cancel` fires.
    #[instrument(
        skip(self, request, cache, cancel),
        fields(
            subsystem = "triage",
            component = "coordinator",
            op = "triage",
            image_count = request.images.len(),
            analysis_path = field::Empty,
            cache_hit = field::Empty,
            category = field::Empty,
            priority = field::Empty,
            confidence = field::Empty,
            duration_ms = field::Empty,
        )
    )]
    pub async fn triage_with_cancel(
        &self,
        request: &ClassificationRequest,
        cache: &ImageDescriptionCache,
        cancel: &CancellationToken,
    ) -> Result<TriageOutcome> {
        let start = Instant::now();
        request.validate()?;
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let text = request.combined_text();
        let plan = self.plan(request, &text, cache);
        let outcome = match plan {
            Plan::Text { text, path } => self.run_text(request, &text, path, cancel).await?,
            Plan::Vision => self.run_vision(request, &text, cancel).await?,
        };

        let span = Span::current();
        span.record(logging::ANALYSIS_PATH, outcome.path.to_string().as_str());
        span.record(logging::CATEGORY, outcome.result.category.as_str());
        span.record(logging::PRIORITY, outcome.result.priority.as_str());
        span.record(logging::CONFIDENCE, outcome.result.confidence);
        span.record(logging::DURATION_MS, start.elapsed().as_millis() as u64);
        info!("Triage complete");
        Ok(outcome)
    }

    fn plan(
        &self,
        request: &ClassificationRequest,
        text: &str,
        cache: &ImageDescriptionCache,
    ) -> Plan {
        let span = Span::current();

        if !request.has_images() {
            return match request.cached_description() {
                Some(description) => Plan::Text {
                    text: combine_with_description(text, description),
                    path: AnalysisPath::CachedDescription,
                },
                None => Plan::Text {
                    text: text.to_string(),
                    path: AnalysisPath::Text,
                },
            };
        }

        if request.force_reanalysis {
            debug!("Re-analysis forced, using vision path");
            return Plan::Vision;
        }

        let cached = cache
            .lookup(&request.images)
            .or_else(|| request.cached_description());
        span.record(logging::CACHE_HIT, cached.is_some());
        if let Some(description) = cached {
            debug!("Reusing cached image description");
            return Plan::Text {
                text: combine_with_description(text, description),
                path: AnalysisPath::CachedDescription,
            };
        }

        if self.specificity.is_text_self_sufficient(text) {
            debug!("Text is self-sufficient, skipping image analysis");
            return Plan::Text {
                text: text.to_string(),
                path: AnalysisPath::SpecificTextOnly,
            };
        }

        debug!("Using vision path");
        Plan::Vision
    }

    async fn run_text(
        &self,
        request: &ClassificationRequest,
        text: &str,
        path: AnalysisPath,
        cancel: &CancellationToken,
    ) -> Result<TriageOutcome> {
        match self.call_text(request, text, cancel).await {
            Ok(raw) => Ok(TriageOutcome {
                result: normalize(raw, request.room_hint()),
                derived_image_description: None,
                path,
            }),
            Err(AnalysisError::Cancelled) => Err(Error::Cancelled),
            Err(e) => {
                warn!(
                    error = %e,
                    analysis_path = %path,
                    "Text analysis failed, using deterministic rules"
                );
                Ok(deterministic_outcome(text, request.room_hint()))
            }
        }
    }

    async fn run_vision(
        &self,
        request: &ClassificationRequest,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<TriageOutcome> {
        let vision_request = VisionAnalysisRequest {
            text,
            room_hint: request.room_hint(),
            images: &request.images,
        };
        let error = match self
            .guarded(cancel, self.vision.analyze_images(&vision_request))
            .await
        {
            Ok(raw) => return Ok(self.vision_outcome(raw, request, text)),
            Err(AnalysisError::Cancelled) => return Err(Error::Cancelled),
            Err(e) => e,
        };

        if text.is_empty() {
            warn!(
                error = %error,
                "Vision analysis failed and there is no text, using deterministic rules"
            );
            return Ok(deterministic_outcome(text, request.room_hint()));
        }

        warn!(error = %error, "Vision analysis failed, falling back to text analysis");
        match self.call_text(request, text, cancel).await {
            Ok(raw) => Ok(TriageOutcome {
                result: normalize(raw, request.room_hint()),
                derived_image_description: None,
                path: AnalysisPath::VisionFallbackToText,
            }),
            Err(AnalysisError::Cancelled) => Err(Error::Cancelled),
            Err(e) => {
                warn!(
                    error = %e,
                    "Text analysis failed after vision failure, using deterministic rules"
                );
                Ok(deterministic_outcome(text, request.room_hint()))
            }
        }
    }

    fn vision_outcome(
        &self,
        raw: RawClassification,
        request: &ClassificationRequest,
        text: &str,
    ) -> TriageOutcome {
        let derived = derive_image_description(&raw);
        let mut result = normalize(raw, request.room_hint());

        if !text.is_empty() {
            if reasoning_leads_with_image(&result.reasoning) {
                debug!("Reasoning leads with the photo instead of the reported problem");
            }
            result.confidence = (result.confidence + self.confidence_boost).min(1.0);
        }

        TriageOutcome {
            result,
            derived_image_description: derived,
            path: AnalysisPath::Vision,
        }
    }

    async fn call_text(
        &self,
        request: &ClassificationRequest,
        text: &str,
        cancel: &CancellationToken,
    ) -> AnalysisResult<RawClassification> {
        let text_request = TextAnalysisRequest::new(text)
            .with_room_hint(request.room_hint().map(str::to_string));
        self.guarded(cancel, self.text.analyze_text(&text_request))
            .await
    }

    /// Apply the per-call deadline and the cancellation token to one call.
    async fn guarded<F>(
        &self,
        cancel: &CancellationToken,
        call: F,
    ) -> AnalysisResult<RawClassification>
    where
        F: Future<Output = AnalysisResult<RawClassification>>,
    {
        let start = Instant::now();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AnalysisError::Cancelled),
            res = tokio::time::timeout(self.analyze_timeout, call) => match res {
                Ok(inner) => inner,
                Err(_) => Err(AnalysisError::Timeout(self.analyze_timeout)),
            },
        };

        let elapsed = start.elapsed().as_millis() as u64;
        if elapsed > defaults::SLOW_ANALYSIS_MS {
            warn!(duration_ms = elapsed, slow = true, "Slow analyzer call");
        }
        result
    }
}

/// Outcome of the deterministic rules, with the room hint applied.
pub fn deterministic_outcome(text: &str, room_hint: Option<&str>) -> TriageOutcome {
    TriageOutcome {
        result: apply_room_hint(fallback::classify(text), room_hint),
        derived_image_description: None,
        path: AnalysisPath::Deterministic,
    }
}

/// Text blob for the text analyzer when photos are known only by description.
fn combine_with_description(text: &str, description: &str) -> String {
    if text.is_empty() {
        format!("Opis priloženih fotografija: {}", description)
    } else {
        format!("{}\n\nOpis priloženih fotografija: {}", text, description)
    }
}

/// Image description to cache after a vision call.
///
/// Prefers the explicit `imageSummary`; otherwise the first sentence of the
/// reasoning, which is best-effort only.
pub fn derive_image_description(raw: &RawClassification) -> Option<String> {
    raw.image_summary
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| raw.reasoning.as_deref().and_then(first_sentence))
}

fn first_sentence(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let mut chars = text.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            let at_boundary = chars.peek().map_or(true, |(_, next)| next.is_whitespace());
            if at_boundary {
                return Some(text[..idx + c.len_utf8()].to_string());
            }
        }
    }
    Some(text.to_string())
}
