//! Error types for kvar.

use std::time::Duration;

use thiserror::Error;

/// Result type alias using kvar's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for kvar operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid input (rejected before any analysis)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The caller abandoned the request
    #[error("Triage cancelled")]
    Cancelled,

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

/// Failure of a single text or vision analyzer invocation.
///
/// Every variant is absorbed by the triage fallback chain; none of them
/// reach the end user.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Network failure before a response arrived
    #[error("Transport failure: {0}")]
    Transport(String),

    /// Service answered with a non-success status
    #[error("Service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Service answered with nothing to parse
    #[error("Empty response payload")]
    EmptyPayload,

    /// Payload present but no well-formed classification in it
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Caller-supplied deadline elapsed
    #[error("Analysis timed out after {0:?}")]
    Timeout(Duration),

    /// Superseded by a newer request
    #[error("Analysis cancelled")]
    Cancelled,
}

impl AnalysisError {
    /// Whether a retry of the same invocation could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) => true,
            Self::Status { status, .. } => *status == 429 || (500..=599).contains(status),
            Self::EmptyPayload | Self::Malformed(_) | Self::Cancelled => false,
        }
    }
}

impl From<reqwest::Error> for AnalysisError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            AnalysisError::Malformed(e.to_string())
        } else {
            AnalysisError::Transport(e.to_string())
        }
    }
}
