//! Centralized default constants for kvar.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates and the CLI reference these constants instead of defining their own
//! magic numbers.
//!
//! The specificity and confidence values here were tuned against real tenant
//! reports. They are product decisions; change them through configuration,
//! not by editing these defaults.

// =============================================================================
// INFERENCE
// =============================================================================

/// Default Ollama base URL.
pub const OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default text classification model (Ollama).
pub const TEXT_MODEL: &str = "qwen2.5:7b";

/// Default multimodal classification model (Ollama).
pub const VISION_MODEL: &str = "qwen2.5vl:7b";

/// Default OpenAI-compatible endpoint.
pub const OPENAI_URL: &str = "https://api.openai.com/v1";

/// Default OpenAI-compatible model (handles both text and images).
pub const OPENAI_MODEL: &str = "gpt-4o-mini";

/// Per-call analyzer timeout in seconds.
pub const ANALYZE_TIMEOUT_SECS: u64 = 60;

/// Health check timeout in seconds.
pub const HEALTH_CHECK_TIMEOUT_SECS: u64 = 5;

/// Calls slower than this are logged with `slow = true`.
pub const SLOW_ANALYSIS_MS: u64 = 30_000;

/// Retries per analyzer invocation before the fallback chain takes over.
pub const ANALYZE_MAX_RETRIES: u32 = 1;

/// Initial backoff between retries in milliseconds (doubles each attempt).
pub const ANALYZE_INITIAL_BACKOFF_MS: u64 = 500;

/// Coordinator deadline for one analyzer invocation. Covers every attempt of
/// the default retry policy plus its backoff sleeps (121 s).
pub const TRIAGE_CALL_TIMEOUT_SECS: u64 = ANALYZE_TIMEOUT_SECS * (ANALYZE_MAX_RETRIES as u64 + 1)
    + (ANALYZE_INITIAL_BACKOFF_MS * ((1 << ANALYZE_MAX_RETRIES) - 1) + 999) / 1000;

// =============================================================================
// TRIAGE
// =============================================================================

/// Maximum number of images accepted on one request.
pub const MAX_IMAGES: usize = 5;

/// Text must be strictly longer than this (in characters) to be considered
/// self-sufficient.
pub const SPECIFICITY_MIN_CHARS: usize = 25;

/// High-specificity keywords. Text naming one of these concretely is enough
/// to classify without looking at photos.
pub const SPECIFICITY_KEYWORDS: &[&str] = &[
    "curi",
    "slavina",
    "bojler",
    "radijator",
    "utičnica",
    "uticnica",
    "osigurač",
    "osigurac",
    "žarulja",
    "zarulja",
    "prozor",
    "vrata",
    "brava",
    "dizalo",
    "wc",
    "tuš",
    "sudoper",
    "odvod",
    "parket",
    "pločica",
    "plocica",
    "interfon",
    "klimatiz",
];

/// Specific keywords that also start unrelated words ("klimav" = wobbly), so
/// they only count when they stand alone.
pub const SPECIFICITY_WHOLE_WORDS: &[&str] = &["klima"];

/// Keywords that are ambiguous without a photo ("cover/cap" could be anything).
pub const IMAGE_REQUIRED_KEYWORDS: &[&str] = &["poklopac"];

/// Confidence added when text and image evidence were combined successfully.
pub const MULTIMODAL_CONFIDENCE_BOOST: f64 = 0.1;

/// Confidence of a deterministic rule hit.
pub const RULE_MATCH_CONFIDENCE: f64 = 0.8;

/// Confidence of the deterministic catch-all result.
pub const DEFAULT_RULE_CONFIDENCE: f64 = 0.3;

/// Confidence assumed when a model omits the field or sends a non-number.
pub const UNSPECIFIED_CONFIDENCE: f64 = 0.5;

/// Length of the BLAKE3 hex prefix embedded in image content keys.
pub const CONTENT_KEY_HASH_LEN: usize = 16;

// =============================================================================
// ENVIRONMENT VARIABLES
// =============================================================================

/// Selects the analyzer backend (`ollama` or `openai`).
pub const ENV_BACKEND: &str = "KVAR_BACKEND";

/// Ollama base URL override.
pub const ENV_OLLAMA_URL: &str = "KVAR_OLLAMA_URL";

/// Ollama text model override.
pub const ENV_TEXT_MODEL: &str = "KVAR_TEXT_MODEL";

/// Ollama vision model override.
pub const ENV_VISION_MODEL: &str = "KVAR_VISION_MODEL";

/// OpenAI-compatible base URL override.
pub const ENV_OPENAI_URL: &str = "KVAR_OPENAI_URL";

/// OpenAI-compatible API key.
pub const ENV_OPENAI_API_KEY: &str = "KVAR_OPENAI_API_KEY";

/// OpenAI-compatible model override.
pub const ENV_OPENAI_MODEL: &str = "KVAR_OPENAI_MODEL";

/// Per-call analyzer timeout override (seconds).
pub const ENV_ANALYZE_TIMEOUT_SECS: &str = "KVAR_ANALYZE_TIMEOUT_SECS";

/// Retry count override.
pub const ENV_ANALYZE_MAX_RETRIES: &str = "KVAR_ANALYZE_MAX_RETRIES";

/// Coordinator deadline override (seconds).
pub const ENV_TRIAGE_TIMEOUT_SECS: &str = "KVAR_TRIAGE_TIMEOUT_SECS";

/// Specificity length threshold override.
pub const ENV_SPECIFICITY_MIN_CHARS: &str = "KVAR_SPECIFICITY_MIN_CHARS";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_specificity_threshold_is_preserved() {
        assert_eq!(SPECIFICITY_MIN_CHARS, 25);
    }

    #[test]
    fn test_triage_deadline_covers_default_retries() {
        assert_eq!(TRIAGE_CALL_TIMEOUT_SECS, 121);
        assert!(TRIAGE_CALL_TIMEOUT_SECS > ANALYZE_TIMEOUT_SECS * 2);
    }

    #[test]
    fn test_confidence_constants_in_range() {
        for c in [
            MULTIMODAL_CONFIDENCE_BOOST,
            RULE_MATCH_CONFIDENCE,
            DEFAULT_RULE_CONFIDENCE,
            UNSPECIFIED_CONFIDENCE,
        ] {
            assert!((0.0..=1.0).contains(&c));
        }
        assert!(RULE_MATCH_CONFIDENCE > DEFAULT_RULE_CONFIDENCE);
    }

    #[test]
    fn test_keyword_lists_are_lowercase() {
        for kw in SPECIFICITY_KEYWORDS
            .iter()
            .chain(SPECIFICITY_WHOLE_WORDS)
            .chain(IMAGE_REQUIRED_KEYWORDS)
        {
            assert_eq!(*kw, kw.to_lowercase(), "keyword {kw} must be case-folded");
        }
    }

    #[test]
    fn test_image_required_keywords_not_specific() {
        for kw in IMAGE_REQUIRED_KEYWORDS {
            assert!(!SPECIFICITY_KEYWORDS.contains(kw));
        }
    }
}
