//! Ollama text analyzer backed by the `/api/chat` endpoint.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use kvar_core::{
    defaults, AnalysisError, AnalysisResult, RawClassification, TextAnalysisRequest, TextAnalyzer,
};

use crate::extract::parse_classification;
use crate::prompts;

/// Default Ollama endpoint.
pub const DEFAULT_OLLAMA_URL: &str = defaults::OLLAMA_URL;

/// Default text classification model.
pub const DEFAULT_TEXT_MODEL: &str = defaults::TEXT_MODEL;

/// Timeout for classification requests (seconds).
pub const ANALYZE_TIMEOUT_SECS: u64 = defaults::ANALYZE_TIMEOUT_SECS;

/// Ollama text analyzer.
pub struct OllamaTextAnalyzer {
    client: Client,
    base_url: String,
    model: String,
    timeout_secs: u64,
}

impl OllamaTextAnalyzer {
    /// Create a new analyzer with default settings.
    pub fn new() -> Self {
        Self::with_config(DEFAULT_OLLAMA_URL.to_string(), DEFAULT_TEXT_MODEL.to_string())
    }

    /// Create a new analyzer against a specific endpoint and model.
    pub fn with_config(base_url: String, model: String) -> Self {
        info!(
            "Initializing Ollama text analyzer: url={}, model={}",
            base_url, model
        );
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            timeout_secs: ANALYZE_TIMEOUT_SECS,
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> Self {
        let base_url = std::env::var(defaults::ENV_OLLAMA_URL)
            .unwrap_or_else(|_| DEFAULT_OLLAMA_URL.to_string());
        let model = std::env::var(defaults::ENV_TEXT_MODEL)
            .unwrap_or_else(|_| DEFAULT_TEXT_MODEL.to_string());
        let timeout = std::env::var(defaults::ENV_ANALYZE_TIMEOUT_SECS)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(ANALYZE_TIMEOUT_SECS);

        Self::with_config(base_url, model).with_timeout(timeout)
    }

    /// Override the per-request HTTP timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    async fn chat_json(&self, system: &str, prompt: &str) -> AnalysisResult<String> {
        let start = Instant::now();

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            stream: false,
            format: Some(serde_json::json!("json")),
            think: Some(false),
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .timeout(Duration::from_secs(self.timeout_secs))
            .json(&request)
            .send()
            .await?;

        let response = ensure_success(response).await?;
        let result: ChatResponse = response.json().await?;

        let content = result.message.content;
        let elapsed = start.elapsed().as_millis() as u64;
        debug!(
            response_len = content.len(),
            duration_ms = elapsed,
            "Text analysis complete"
        );
        if elapsed > defaults::SLOW_ANALYSIS_MS {
            warn!(
                duration_ms = elapsed,
                prompt_len = prompt.len(),
                slow = true,
                "Slow text analysis"
            );
        }
        Ok(content)
    }
}

impl Default for OllamaTextAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a non-success response to [`AnalysisError::Status`].
pub(crate) async fn ensure_success(response: Response) -> AnalysisResult<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(AnalysisError::Status { status, body })
}

/// Probe `/api/tags`; any failure is reported as "not ready" rather than an error.
pub(crate) async fn probe_tags(client: &Client, base_url: &str, component: &str) -> bool {
    let response = client
        .get(format!("{}/api/tags", base_url))
        .timeout(Duration::from_secs(defaults::HEALTH_CHECK_TIMEOUT_SECS))
        .send()
        .await;

    match response {
        Ok(resp) if resp.status().is_success() => {
            info!(component, "Ollama health check passed");
            true
        }
        Ok(resp) => {
            warn!(component, "Ollama health check failed: {}", resp.status());
            false
        }
        Err(e) => {
            warn!(component, "Ollama health check error: {}", e);
            false
        }
    }
}

/// Chat API message for `/api/chat`.
#[derive(Serialize, Deserialize, Clone)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Request payload for the Ollama `/api/chat` endpoint.
#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    /// Set to `"json"` to constrain output to a JSON document.
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<serde_json::Value>,
    /// Suppresses chain-of-thought output on models that support it.
    #[serde(skip_serializing_if = "Option::is_none")]
    think: Option<bool>,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

#[async_trait]
impl TextAnalyzer for OllamaTextAnalyzer {
    #[instrument(skip(self, request), fields(subsystem = "inference", component = "ollama", op = "analyze_text", model = %self.model, prompt_len = request.text.len()))]
    async fn analyze_text(
        &self,
        request: &TextAnalysisRequest,
    ) -> AnalysisResult<RawClassification> {
        let system = prompts::system_prompt();
        let prompt = prompts::text_prompt(request);
        let content = self.chat_json(&system, &prompt).await?;
        parse_classification(&content)
    }

    async fn health_check(&self) -> AnalysisResult<bool> {
        Ok(probe_tags(&self.client, &self.base_url, "ollama").await)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
