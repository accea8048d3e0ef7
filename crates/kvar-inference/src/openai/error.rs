//! OpenAI-specific error handling.

use kvar_core::AnalysisError;

use super::types::OpenAIErrorResponse;

/// OpenAI-specific error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAIErrorCode {
    /// Invalid authentication credentials.
    AuthenticationError,
    /// Rate limit exceeded.
    RateLimitExceeded,
    /// Model not found or not available.
    ModelNotFound,
    /// Request too large (usually too many or too big images).
    ContextLengthExceeded,
    ServerError,
    Unknown,
}

impl OpenAIErrorCode {
    /// Determine error code from HTTP status and error type.
    pub fn from_response(status: u16, error_type: &str) -> Self {
        match (status, error_type) {
            (401, _) => Self::AuthenticationError,
            (429, _) => Self::RateLimitExceeded,
            (404, _) | (_, "model_not_found") => Self::ModelNotFound,
            (400, _) if error_type.contains("context_length") => Self::ContextLengthExceeded,
            (500..=599, _) => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimitExceeded | Self::ServerError)
    }
}

/// Convert a failed response body into an [`AnalysisError::Status`].
///
/// Structured error bodies contribute their message; anything else is kept
/// verbatim.
pub fn to_analysis_error(status: u16, body: &str) -> (OpenAIErrorCode, AnalysisError) {
    let (error_type, message) = match serde_json::from_str::<OpenAIErrorResponse>(body) {
        Ok(parsed) => {
            let error_type = parsed
                .error
                .code
                .unwrap_or(parsed.error.error_type);
            (error_type, parsed.error.message)
        }
        Err(_) => (String::new(), body.to_string()),
    };
    let code = OpenAIErrorCode::from_response(status, &error_type);
    (
        code,
        AnalysisError::Status {
            status,
            body: message,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_from_401() {
        let code = OpenAIErrorCode::from_response(401, "invalid_api_key");
        assert_eq!(code, OpenAIErrorCode::AuthenticationError);
    }

    #[test]
    fn test_error_code_from_429() {
        let code = OpenAIErrorCode::from_response(429, "rate_limit_exceeded");
        assert_eq!(code, OpenAIErrorCode::RateLimitExceeded);
    }

    #[test]
    fn test_error_code_model_not_found_by_type() {
        let code = OpenAIErrorCode::from_response(400, "model_not_found");
        assert_eq!(code, OpenAIErrorCode::ModelNotFound);
    }

    #[test]
    fn test_error_code_context_length() {
        let code = OpenAIErrorCode::from_response(400, "context_length_exceeded");
        assert_eq!(code, OpenAIErrorCode::ContextLengthExceeded);
    }

    #[test]
    fn test_error_code_from_502() {
        let code = OpenAIErrorCode::from_response(502, "bad_gateway");
        assert_eq!(code, OpenAIErrorCode::ServerError);
        assert!(code.is_retryable());
    }

    #[test]
    fn test_not_retryable_auth() {
        assert!(!OpenAIErrorCode::AuthenticationError.is_retryable());
        assert!(!OpenAIErrorCode::Unknown.is_retryable());
    }

    #[test]
    fn test_structured_body_message_extracted() {
        let body = r#"{"error": {"message": "Rate limit reached", "type": "requests", "code": "rate_limit_exceeded"}}"#;
        let (code, err) = to_analysis_error(429, body);
        assert_eq!(code, OpenAIErrorCode::RateLimitExceeded);
        assert_eq!(
            err,
            AnalysisError::Status {
                status: 429,
                body: "Rate limit reached".to_string()
            }
        );
        assert!(err.is_retryable());
    }

    #[test]
    fn test_unstructured_body_kept() {
        let (code, err) = to_analysis_error(503, "upstream unavailable");
        assert_eq!(code, OpenAIErrorCode::ServerError);
        assert_eq!(
            err,
            AnalysisError::Status {
                status: 503,
                body: "upstream unavailable".to_string()
            }
        );
    }
}
