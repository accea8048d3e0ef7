//! OpenAI-compatible multimodal analyzer.

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use kvar_core::{
    defaults, AnalysisError, AnalysisResult, Error, ImageBlob, RawClassification, Result,
    TextAnalysisRequest, TextAnalyzer, VisionAnalysisRequest, VisionAnalyzer,
};

use super::error::to_analysis_error;
use super::types::*;
use crate::extract::parse_classification;
use crate::prompts;

/// Default OpenAI API endpoint.
pub const DEFAULT_OPENAI_URL: &str = defaults::OPENAI_URL;

/// Default model, used for both text and images.
pub const DEFAULT_MODEL: &str = defaults::OPENAI_MODEL;

/// Default timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = defaults::ANALYZE_TIMEOUT_SECS;

/// Configuration for the OpenAI-compatible analyzer.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// Base URL for the API endpoint.
    pub base_url: String,
    /// API key for authentication (optional for local endpoints).
    pub api_key: Option<String>,
    /// Model used for text-only classification.
    pub text_model: String,
    /// Model used when photos are attached; must accept image input.
    pub vision_model: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
    /// Skip TLS verification (for self-signed certs in local environments).
    pub skip_tls_verify: bool,
    /// HTTP-Referer header for OpenRouter.ai rankings (optional).
    pub http_referer: Option<String>,
    /// X-Title header for app name on OpenRouter.ai (optional).
    pub x_title: Option<String>,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OPENAI_URL.to_string(),
            api_key: None,
            text_model: DEFAULT_MODEL.to_string(),
            vision_model: DEFAULT_MODEL.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
            skip_tls_verify: false,
            http_referer: None,
            x_title: None,
        }
    }
}

/// OpenAI-compatible analyzer implementing both the text and vision roles.
pub struct OpenAIAnalyzer {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIAnalyzer {
    /// Create a new analyzer with the given configuration.
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        let mut client_builder =
            Client::builder().timeout(Duration::from_secs(config.timeout_seconds));

        if config.skip_tls_verify {
            client_builder = client_builder.danger_accept_invalid_certs(true);
        }

        let client = client_builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            "Initializing OpenAI analyzer: url={}, text={}, vision={}",
            config.base_url, config.text_model, config.vision_model
        );

        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        let model = std::env::var(defaults::ENV_OPENAI_MODEL)
            .unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let config = OpenAIConfig {
            base_url: std::env::var(defaults::ENV_OPENAI_URL)
                .unwrap_or_else(|_| DEFAULT_OPENAI_URL.to_string()),
            api_key: std::env::var(defaults::ENV_OPENAI_API_KEY).ok(),
            text_model: model.clone(),
            vision_model: model,
            timeout_seconds: std::env::var(defaults::ENV_ANALYZE_TIMEOUT_SECS)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
            skip_tls_verify: std::env::var("KVAR_OPENAI_SKIP_TLS_VERIFY")
                .map(|v| v == "1" || v.to_lowercase() == "true")
                .unwrap_or(false),
            http_referer: std::env::var("KVAR_OPENAI_HTTP_REFERER").ok(),
            x_title: std::env::var("KVAR_OPENAI_X_TITLE").ok(),
        };

        Self::new(config)
    }

    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint)
    }

    /// Build a POST request with authentication if configured.
    fn build_request(&self, endpoint: &str) -> reqwest::RequestBuilder {
        let mut req = self.client.post(self.url(endpoint));

        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }
        if let Some(ref referer) = self.config.http_referer {
            req = req.header("HTTP-Referer", referer);
        }
        if let Some(ref title) = self.config.x_title {
            req = req.header("X-Title", title);
        }

        req.header("Content-Type", "application/json")
    }

    fn build_get_request(&self, endpoint: &str) -> reqwest::RequestBuilder {
        let mut req = self.client.get(self.url(endpoint));
        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }
        req
    }

    /// Send one chat completion and return the assistant's text.
    async fn complete(&self, model: &str, messages: Vec<ChatMessage>) -> AnalysisResult<String> {
        let start = Instant::now();
        let request = ChatCompletionRequest {
            model: model.to_string(),
            messages,
            temperature: Some(0.0),
            response_format: Some(ResponseFormat::json_object()),
            stream: false,
        };

        let response = self
            .build_request("/chat/completions")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let (code, err) = to_analysis_error(status, &body);
            warn!(status, error_code = ?code, "OpenAI request rejected");
            return Err(err);
        }

        let result: ChatCompletionResponse = response.json().await?;
        let content = result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(AnalysisError::EmptyPayload)?;

        let elapsed = start.elapsed().as_millis() as u64;
        debug!(
            response_len = content.len(),
            duration_ms = elapsed,
            "Completion finished"
        );
        if elapsed > defaults::SLOW_ANALYSIS_MS {
            warn!(duration_ms = elapsed, slow = true, "Slow completion");
        }
        Ok(content)
    }
}

/// `data:` URI for inline image upload.
pub fn data_uri(image: &ImageBlob) -> String {
    format!(
        "data:{};base64,{}",
        image.mime_type(),
        base64::engine::general_purpose::STANDARD.encode(&image.data)
    )
}

#[async_trait]
impl TextAnalyzer for OpenAIAnalyzer {
    #[instrument(skip(self, request), fields(subsystem = "inference", component = "openai", op = "analyze_text", model = %self.config.text_model, prompt_len = request.text.len()))]
    async fn analyze_text(
        &self,
        request: &TextAnalysisRequest,
    ) -> AnalysisResult<RawClassification> {
        let messages = vec![
            ChatMessage::system(prompts::system_prompt()),
            ChatMessage::user(prompts::text_prompt(request)),
        ];
        let content = self.complete(&self.config.text_model, messages).await?;
        parse_classification(&content)
    }

    async fn health_check(&self) -> AnalysisResult<bool> {
        Ok(self.probe_models().await)
    }

    fn model_name(&self) -> &str {
        &self.config.text_model
    }
}

#[async_trait]
impl VisionAnalyzer for OpenAIAnalyzer {
    #[instrument(skip(self, request), fields(subsystem = "inference", component = "openai", op = "analyze_images", model = %self.config.vision_model, image_count = request.images.len()))]
    async fn analyze_images(
        &self,
        request: &VisionAnalysisRequest<'_>,
    ) -> AnalysisResult<RawClassification> {
        let mut parts = vec![ContentPart::Text {
            text: prompts::vision_prompt(request),
        }];
        parts.extend(request.images.iter().map(|image| ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: data_uri(image),
            },
        }));

        let messages = vec![
            ChatMessage::system(prompts::system_prompt()),
            ChatMessage::user_parts(parts),
        ];
        let content = self.complete(&self.config.vision_model, messages).await?;
        parse_classification(&content)
    }

    async fn health_check(&self) -> AnalysisResult<bool> {
        Ok(self.probe_models().await)
    }

    fn model_name(&self) -> &str {
        &self.config.vision_model
    }
}

impl OpenAIAnalyzer {
    /// Minimal `/models` request; failures report "not ready".
    async fn probe_models(&self) -> bool {
        let response = self
            .build_get_request("/models")
            .timeout(Duration::from_secs(defaults::HEALTH_CHECK_TIMEOUT_SECS))
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                info!("OpenAI health check passed");
                true
            }
            Ok(resp) => {
                warn!("OpenAI health check failed: {}", resp.status());
                false
            }
            Err(e) => {
                warn!("OpenAI health check error: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OpenAIConfig::default();
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.text_model, "gpt-4o-mini");
        assert_eq!(config.vision_model, "gpt-4o-mini");
        assert!(config.api_key.is_none());
        assert!(!config.skip_tls_verify);
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let analyzer = OpenAIAnalyzer::new(OpenAIConfig {
            base_url: "http://localhost:11434/v1/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            analyzer.url("/chat/completions"),
            "http://localhost:11434/v1/chat/completions"
        );
    }

    #[test]
    fn test_model_names_per_role() {
        let analyzer = OpenAIAnalyzer::new(OpenAIConfig {
            text_model: "text-m".to_string(),
            vision_model: "vision-m".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(TextAnalyzer::model_name(&analyzer), "text-m");
        assert_eq!(VisionAnalyzer::model_name(&analyzer), "vision-m");
    }

    #[test]
    fn test_data_uri_uses_detected_mime() {
        let png = ImageBlob::new(
            "photo.bin",
            vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0],
        );
        assert!(data_uri(&png).starts_with("data:image/png;base64,iVBORw0KGgo"));
    }
}
