//! Analyzer traits for the external reasoning services.
//!
//! Implementations live in `kvar-inference`; the triage coordinator depends
//! only on these traits so clients are constructed and owned by the host
//! process and injected, never created as globals.

use async_trait::async_trait;

use crate::error::AnalysisError;
use crate::models::{ImageBlob, RawClassification};

/// Result type for a single analyzer invocation.
pub type AnalysisResult<T> = std::result::Result<T, AnalysisError>;

/// Input to a text-only classification call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextAnalysisRequest {
    /// Reporter text, possibly combined with a cached image description.
    pub text: String,
    /// Free-form room hint from the reporting form.
    pub room_hint: Option<String>,
}

impl TextAnalysisRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            room_hint: None,
        }
    }

    pub fn with_room_hint(mut self, room_hint: Option<String>) -> Self {
        self.room_hint = room_hint;
        self
    }
}

/// Input to a multimodal classification call.
#[derive(Debug, Clone, Copy)]
pub struct VisionAnalysisRequest<'a> {
    /// Reporter text; may be empty when only photos were supplied.
    pub text: &'a str,
    pub room_hint: Option<&'a str>,
    pub images: &'a [ImageBlob],
}

/// Text-only reasoning service.
#[async_trait]
pub trait TextAnalyzer: Send + Sync {
    /// Classify free text.
    async fn analyze_text(&self, request: &TextAnalysisRequest) -> AnalysisResult<RawClassification>;

    /// Check if the service is reachable.
    async fn health_check(&self) -> AnalysisResult<bool>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}

/// Multimodal reasoning service.
#[async_trait]
pub trait VisionAnalyzer: Send + Sync {
    /// Classify text together with photos.
    ///
    /// When both are present the reasoning must state the reporter's problem
    /// before anything inferred from the photos, and category/priority follow
    /// the reporter's text.
    async fn analyze_images(
        &self,
        request: &VisionAnalysisRequest<'_>,
    ) -> AnalysisResult<RawClassification>;

    /// Check if the service is reachable.
    async fn health_check(&self) -> AnalysisResult<bool>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}
