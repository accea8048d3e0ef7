//! Analyzer configuration.
//!
//! Selects the backend serving the text and vision roles and constructs the
//! analyzers. Configuration can be loaded from:
//! - the `[inference]` table of a TOML file, with `${VAR}` substitution
//! - environment variables (`KVAR_*` prefixed)
//!
//! # Example
//!
//! ```rust,no_run
//! use kvar_inference::config::AnalyzerConfig;
//!
//! let config = AnalyzerConfig::from_file(std::path::Path::new("kvar.toml"))
//!     .unwrap_or_else(|_| AnalyzerConfig::from_env());
//! let analyzers = config.build().expect("analyzers");
//! println!("text model: {}", analyzers.text.model_name());
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use kvar_core::{defaults, TextAnalyzer, VisionAnalyzer};

use crate::retry::RetryPolicy;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Invalid backend: {0}")]
    InvalidBackend(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Failed to construct analyzer: {0}")]
    Build(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Service family serving both analyzer roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnalyzerBackend {
    #[default]
    Ollama,
    OpenAI,
}

impl FromStr for AnalyzerBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            _ => Err(ConfigError::InvalidBackend(s.to_string())),
        }
    }
}

impl fmt::Display for AnalyzerBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ollama => write!(f, "ollama"),
            Self::OpenAI => write!(f, "openai"),
        }
    }
}

/// Ollama settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaSettings {
    pub base_url: String,
    pub text_model: String,
    pub vision_model: String,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            base_url: defaults::OLLAMA_URL.to_string(),
            text_model: defaults::TEXT_MODEL.to_string(),
            vision_model: defaults::VISION_MODEL.to_string(),
        }
    }
}

impl OllamaSettings {
    pub fn validate(&self) -> ConfigResult<()> {
        validate_url("Ollama", &self.base_url)?;
        require_model("Ollama text_model", &self.text_model)?;
        require_model("Ollama vision_model", &self.vision_model)
    }
}

/// OpenAI-compatible settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAISettings {
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub text_model: String,
    pub vision_model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_referer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_title: Option<String>,
}

impl Default for OpenAISettings {
    fn default() -> Self {
        Self {
            base_url: defaults::OPENAI_URL.to_string(),
            api_key: None,
            text_model: defaults::OPENAI_MODEL.to_string(),
            vision_model: defaults::OPENAI_MODEL.to_string(),
            http_referer: None,
            x_title: None,
        }
    }
}

impl OpenAISettings {
    pub fn validate(&self) -> ConfigResult<()> {
        validate_url("OpenAI", &self.base_url)?;
        require_model("OpenAI text_model", &self.text_model)?;
        require_model("OpenAI vision_model", &self.vision_model)
    }
}

fn validate_url(name: &str, url: &str) -> ConfigResult<()> {
    if url.is_empty() {
        return Err(ConfigError::Validation(format!(
            "{} base_url cannot be empty",
            name
        )));
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{} base_url must start with http:// or https://, got: {}",
            name, url
        )));
    }
    Ok(())
}

fn require_model(name: &str, model: &str) -> ConfigResult<()> {
    if model.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
    }
    Ok(())
}

/// Analyzer configuration (`[inference]` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub backend: AnalyzerBackend,
    pub ollama: OllamaSettings,
    pub openai: OpenAISettings,
    /// HTTP timeout for one analyzer request.
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            backend: AnalyzerBackend::default(),
            ollama: OllamaSettings::default(),
            openai: OpenAISettings::default(),
            timeout_secs: defaults::ANALYZE_TIMEOUT_SECS,
            max_retries: defaults::ANALYZE_MAX_RETRIES,
            initial_backoff_ms: defaults::ANALYZE_INITIAL_BACKOFF_MS,
        }
    }
}

/// Text and vision analyzers ready for injection into a coordinator.
#[derive(Clone)]
pub struct Analyzers {
    pub text: Arc<dyn TextAnalyzer>,
    pub vision: Arc<dyn VisionAnalyzer>,
}

impl fmt::Debug for Analyzers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Analyzers")
            .field("text", &self.text.model_name())
            .field("vision", &self.vision.model_name())
            .finish()
    }
}

impl AnalyzerConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables keep their defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(backend) = env::var(defaults::ENV_BACKEND)
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.backend = backend;
        }
        if let Ok(url) = env::var(defaults::ENV_OLLAMA_URL) {
            config.ollama.base_url = url;
        }
        if let Ok(model) = env::var(defaults::ENV_TEXT_MODEL) {
            config.ollama.text_model = model;
        }
        if let Ok(model) = env::var(defaults::ENV_VISION_MODEL) {
            config.ollama.vision_model = model;
        }
        if let Ok(url) = env::var(defaults::ENV_OPENAI_URL) {
            config.openai.base_url = url;
        }
        config.openai.api_key = env::var(defaults::ENV_OPENAI_API_KEY).ok();
        if let Ok(model) = env::var(defaults::ENV_OPENAI_MODEL) {
            config.openai.text_model = model.clone();
            config.openai.vision_model = model;
        }
        if let Some(secs) = env::var(defaults::ENV_ANALYZE_TIMEOUT_SECS)
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.timeout_secs = secs;
        }
        if let Some(retries) = env::var(defaults::ENV_ANALYZE_MAX_RETRIES)
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.max_retries = retries;
        }

        debug!(backend = %config.backend, "Analyzer config loaded from environment");
        config
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        info!("Loading analyzer config from: {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse the `[inference]` table of a TOML document.
    ///
    /// A document without the table yields the defaults.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let content = substitute_env_vars(content)?;

        #[derive(Deserialize)]
        struct TomlRoot {
            #[serde(default)]
            inference: AnalyzerConfig,
        }

        let root: TomlRoot = toml::from_str(&content)?;
        root.inference.validate()?;
        Ok(root.inference)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        match self.backend {
            AnalyzerBackend::Ollama => self.ollama.validate(),
            AnalyzerBackend::OpenAI => self.openai.validate(),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
        }
    }

    /// Worst-case duration of one analyzer invocation, retries included.
    pub fn call_budget(&self) -> Duration {
        self.retry_policy().budget(Duration::from_secs(self.timeout_secs))
    }

    /// Construct the configured analyzers, each wrapped in the retry policy.
    pub fn build(&self) -> ConfigResult<Analyzers> {
        self.validate()?;
        info!(
            backend = %self.backend,
            timeout_secs = self.timeout_secs,
            max_retries = self.max_retries,
            "Building analyzers"
        );
        match self.backend {
            AnalyzerBackend::Ollama => self.build_ollama(),
            AnalyzerBackend::OpenAI => self.build_openai(),
        }
    }

    #[cfg(feature = "ollama")]
    fn build_ollama(&self) -> ConfigResult<Analyzers> {
        use crate::ollama::OllamaTextAnalyzer;
        use crate::retry::RetryingAnalyzer;
        use crate::vision::OllamaVisionAnalyzer;

        let text = OllamaTextAnalyzer::with_config(
            self.ollama.base_url.clone(),
            self.ollama.text_model.clone(),
        )
        .with_timeout(self.timeout_secs);
        let vision = OllamaVisionAnalyzer::new(
            self.ollama.base_url.clone(),
            self.ollama.vision_model.clone(),
        )
        .with_timeout(self.timeout_secs);

        Ok(Analyzers {
            text: Arc::new(RetryingAnalyzer::new(text, self.retry_policy())),
            vision: Arc::new(RetryingAnalyzer::new(vision, self.retry_policy())),
        })
    }

    #[cfg(not(feature = "ollama"))]
    fn build_ollama(&self) -> ConfigResult<Analyzers> {
        Err(ConfigError::InvalidBackend(
            "ollama (built without the `ollama` feature)".to_string(),
        ))
    }

    #[cfg(feature = "openai")]
    fn build_openai(&self) -> ConfigResult<Analyzers> {
        use crate::openai::{OpenAIAnalyzer, OpenAIConfig};
        use crate::retry::RetryingAnalyzer;

        let analyzer = OpenAIAnalyzer::new(OpenAIConfig {
            base_url: self.openai.base_url.clone(),
            api_key: self.openai.api_key.clone(),
            text_model: self.openai.text_model.clone(),
            vision_model: self.openai.vision_model.clone(),
            timeout_seconds: self.timeout_secs,
            skip_tls_verify: false,
            http_referer: self.openai.http_referer.clone(),
            x_title: self.openai.x_title.clone(),
        })
        .map_err(|e| ConfigError::Build(e.to_string()))?;

        let shared = Arc::new(RetryingAnalyzer::new(analyzer, self.retry_policy()));
        Ok(Analyzers {
            text: shared.clone(),
            vision: shared,
        })
    }

    #[cfg(not(feature = "openai"))]
    fn build_openai(&self) -> ConfigResult<Analyzers> {
        Err(ConfigError::InvalidBackend(
            "openai (built without the `openai` feature)".to_string(),
        ))
    }
}

/// Substitute environment variables in the format `${VAR_NAME}`.
///
/// Unset variables are left as written.
pub fn substitute_env_vars(content: &str) -> ConfigResult<String> {
    let re = regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| ConfigError::Validation(e.to_string()))?;
    Ok(re
        .replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.backend, AnalyzerBackend::Ollama);
        assert_eq!(config.ollama.base_url, defaults::OLLAMA_URL);
        assert_eq!(config.ollama.vision_model, defaults::VISION_MODEL);
        assert_eq!(config.timeout_secs, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_call_budget_includes_retries() {
        let config = AnalyzerConfig {
            timeout_secs: 30,
            max_retries: 2,
            initial_backoff_ms: 1000,
            ..Default::default()
        };
        // three 30 s attempts, 1 s + 2 s of backoff
        assert_eq!(config.call_budget(), Duration::from_secs(93));
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("Ollama".parse::<AnalyzerBackend>().unwrap(), AnalyzerBackend::Ollama);
        assert_eq!(" openai ".parse::<AnalyzerBackend>().unwrap(), AnalyzerBackend::OpenAI);
        assert!(matches!(
            "bedrock".parse::<AnalyzerBackend>(),
            Err(ConfigError::InvalidBackend(_))
        ));
        assert_eq!(AnalyzerBackend::OpenAI.to_string(), "openai");
    }

    #[test]
    fn test_from_toml_str() {
        let toml = r#"
            [inference]
            backend = "ollama"
            timeout_secs = 20
            max_retries = 0

            [inference.ollama]
            base_url = "http://gpu-box:11434"
            text_model = "llama3.1:8b"
        "#;
        let config = AnalyzerConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.ollama.base_url, "http://gpu-box:11434");
        assert_eq!(config.ollama.text_model, "llama3.1:8b");
        // Unset fields keep defaults
        assert_eq!(config.ollama.vision_model, defaults::VISION_MODEL);
        assert_eq!(config.timeout_secs, 20);
        assert_eq!(config.retry_policy(), RetryPolicy {
            max_retries: 0,
            initial_backoff: Duration::from_millis(defaults::ANALYZE_INITIAL_BACKOFF_MS),
        });
    }

    #[test]
    fn test_missing_table_yields_defaults() {
        let config = AnalyzerConfig::from_toml_str("[triage]\nconfidence_boost = 0.2\n").unwrap();
        assert_eq!(config, AnalyzerConfig::default());
    }

    #[test]
    fn test_invalid_url_rejected() {
        let toml = "[inference.ollama]\nbase_url = \"localhost:11434\"\n";
        assert!(matches!(
            AnalyzerConfig::from_toml_str(toml),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_openai_validated_only_when_selected() {
        let mut config = AnalyzerConfig::default();
        config.openai.text_model = String::new();
        assert!(config.validate().is_ok());
        config.backend = AnalyzerBackend::OpenAI;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = AnalyzerConfig {
            timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_parse_error() {
        assert!(matches!(
            AnalyzerConfig::from_toml_str("[inference\nbackend ="),
            Err(ConfigError::TomlParse(_))
        ));
    }

    #[test]
    fn test_env_var_substitution_with_value() {
        env::set_var("KVAR_TEST_SUBSTITUTION_VAR", "sk-test");
        let result = substitute_env_vars("api_key = \"${KVAR_TEST_SUBSTITUTION_VAR}\"").unwrap();
        env::remove_var("KVAR_TEST_SUBSTITUTION_VAR");
        assert_eq!(result, "api_key = \"sk-test\"");
    }

    #[test]
    fn test_env_var_substitution_missing() {
        let content = "api_key = \"${KVAR_NONEXISTENT_TEST_VAR_12345}\"";
        assert_eq!(substitute_env_vars(content).unwrap(), content);
    }

    #[cfg(feature = "ollama")]
    #[test]
    fn test_build_ollama() {
        let analyzers = AnalyzerConfig::default().build().unwrap();
        assert_eq!(analyzers.text.model_name(), defaults::TEXT_MODEL);
        assert_eq!(analyzers.vision.model_name(), defaults::VISION_MODEL);
    }

    #[cfg(feature = "openai")]
    #[test]
    fn test_build_openai() {
        let config = AnalyzerConfig {
            backend: AnalyzerBackend::OpenAI,
            ..Default::default()
        };
        let analyzers = config.build().unwrap();
        assert_eq!(analyzers.text.model_name(), defaults::OPENAI_MODEL);
    }
}
