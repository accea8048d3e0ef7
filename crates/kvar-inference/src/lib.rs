//! # kvar-inference
//!
//! Adapters for the external reasoning services used by kvar triage.
//!
//! This crate provides:
//! - Ollama text analyzer (`/api/chat`) and vision analyzer (`/api/generate`)
//! - OpenAI-compatible analyzer serving both roles (optional, feature `openai`)
//! - Prompt construction carrying the text-before-image instruction contract
//! - Tolerant extraction of a classification from model output
//! - Retry-with-backoff decorator
//! - Analyzer configuration from environment or TOML
//! - Mock analyzers (feature `mock`)
//!
//! # Feature Flags
//!
//! - `ollama` (default): Enable Ollama analyzers
//! - `openai`: Enable OpenAI-compatible analyzer
//! - `mock`: Export scripted mock analyzers for dependent crates' tests
//!
//! # Example
//!
//! ```rust,no_run
//! use kvar_inference::{OllamaTextAnalyzer, TextAnalysisRequest, TextAnalyzer};
//!
//! #[tokio::main]
//! async fn main() {
//!     let analyzer = OllamaTextAnalyzer::from_env();
//!     let request = TextAnalysisRequest::new("Ne radi grijanje u dnevnom boravku");
//!     let raw = analyzer.analyze_text(&request).await.unwrap();
//!     println!("{} / {:?}", raw.category, raw.priority);
//! }
//! ```

pub mod config;
pub mod extract;
pub mod prompts;
pub mod retry;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "ollama")]
pub mod vision;

#[cfg(feature = "openai")]
pub mod openai;

// Scripted analyzers for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export core types
pub use kvar_core::*;

pub use config::{AnalyzerBackend, AnalyzerConfig, Analyzers, ConfigError, ConfigResult};
pub use extract::parse_classification;
pub use retry::{RetryPolicy, RetryingAnalyzer};

#[cfg(feature = "ollama")]
pub use ollama::OllamaTextAnalyzer;

#[cfg(feature = "ollama")]
pub use vision::OllamaVisionAnalyzer;

#[cfg(feature = "openai")]
pub use openai::{OpenAIAnalyzer, OpenAIConfig};
