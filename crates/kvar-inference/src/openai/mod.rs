//! OpenAI-compatible analyzer.
//!
//! Works with any endpoint implementing `/chat/completions` with image
//! content parts, including:
//!
//! - OpenAI cloud API
//! - OpenRouter
//! - Ollama (in OpenAI compatibility mode)
//! - vLLM, LM Studio
//!
//! # Example
//!
//! ```rust,no_run
//! use kvar_core::{TextAnalysisRequest, TextAnalyzer};
//! use kvar_inference::openai::{OpenAIAnalyzer, OpenAIConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = OpenAIConfig {
//!         base_url: "http://localhost:11434/v1".to_string(),
//!         text_model: "qwen2.5:7b".to_string(),
//!         vision_model: "qwen2.5vl:7b".to_string(),
//!         ..Default::default()
//!     };
//!     let analyzer = OpenAIAnalyzer::new(config).unwrap();
//!
//!     let request = TextAnalysisRequest::new("Curi voda ispod sudopera");
//!     let raw = analyzer.analyze_text(&request).await.unwrap();
//!     println!("{}", raw.category);
//! }
//! ```

mod backend;
mod error;
mod types;

pub use backend::{
    data_uri, OpenAIAnalyzer, OpenAIConfig, DEFAULT_MODEL, DEFAULT_OPENAI_URL,
    DEFAULT_TIMEOUT_SECS,
};
pub use error::{to_analysis_error, OpenAIErrorCode};
pub use types::*;
