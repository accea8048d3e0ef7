//! Ollama vision analyzer backed by the `/api/generate` endpoint.

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use kvar_core::{
    defaults, AnalysisResult, ImageBlob, RawClassification, VisionAnalysisRequest,
    VisionAnalyzer,
};

use crate::extract::parse_classification;
use crate::ollama::{ensure_success, probe_tags};
use crate::prompts;

/// Default multimodal model.
pub const DEFAULT_VISION_MODEL: &str = defaults::VISION_MODEL;

/// Ollama-based vision analyzer (e.g. qwen2.5vl, llava).
pub struct OllamaVisionAnalyzer {
    base_url: String,
    model: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl OllamaVisionAnalyzer {
    pub fn new(base_url: String, model: String) -> Self {
        info!(
            "Initializing Ollama vision analyzer: url={}, model={}",
            base_url, model
        );
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            client: reqwest::Client::new(),
            timeout_secs: defaults::ANALYZE_TIMEOUT_SECS,
        }
    }

    /// Create from environment variables.
    /// Returns None if `KVAR_VISION_MODEL` is set to an empty string.
    pub fn from_env() -> Option<Self> {
        let model = match std::env::var(defaults::ENV_VISION_MODEL) {
            Ok(val) if val.trim().is_empty() => return None,
            Ok(val) => val,
            Err(_) => DEFAULT_VISION_MODEL.to_string(),
        };
        let base_url = std::env::var(defaults::ENV_OLLAMA_URL)
            .unwrap_or_else(|_| defaults::OLLAMA_URL.to_string());
        let timeout = std::env::var(defaults::ENV_ANALYZE_TIMEOUT_SECS)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::ANALYZE_TIMEOUT_SECS);
        Some(Self::new(base_url, model).with_timeout(timeout))
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Base64-encode every image for the `images` field.
fn encode_images(images: &[ImageBlob]) -> Vec<String> {
    images
        .iter()
        .map(|image| base64::engine::general_purpose::STANDARD.encode(&image.data))
        .collect()
}

#[derive(Serialize)]
struct OllamaGenerateRequest {
    model: String,
    system: String,
    prompt: String,
    images: Vec<String>, // base64 encoded
    stream: bool,
    format: String,
}

#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

#[async_trait]
impl VisionAnalyzer for OllamaVisionAnalyzer {
    #[instrument(skip(self, request), fields(subsystem = "inference", component = "ollama_vision", op = "analyze_images", model = %self.model, image_count = request.images.len()))]
    async fn analyze_images(
        &self,
        request: &VisionAnalysisRequest<'_>,
    ) -> AnalysisResult<RawClassification> {
        let start = Instant::now();
        let prompt = prompts::vision_prompt(request);

        let body = OllamaGenerateRequest {
            model: self.model.clone(),
            system: prompts::system_prompt(),
            prompt,
            images: encode_images(request.images),
            stream: false,
            format: "json".to_string(),
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .timeout(Duration::from_secs(self.timeout_secs))
            .send()
            .await?;

        let response = ensure_success(response).await?;
        let result: OllamaGenerateResponse = response.json().await?;

        let elapsed = start.elapsed().as_millis() as u64;
        debug!(
            response_len = result.response.len(),
            duration_ms = elapsed,
            "Vision analysis complete"
        );
        if elapsed > defaults::SLOW_ANALYSIS_MS {
            warn!(
                duration_ms = elapsed,
                image_count = request.images.len(),
                slow = true,
                "Slow vision analysis"
            );
        }

        parse_classification(&result.response)
    }

    async fn health_check(&self) -> AnalysisResult<bool> {
        Ok(probe_tags(&self.client, &self.base_url, "ollama_vision").await)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
