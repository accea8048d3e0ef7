//! Tolerant extraction of a classification from model output.
//!
//! Models asked for JSON still wrap it in code fences or prose now and then.
//! Parsing tries the whole payload first, then the first well-formed JSON
//! object found anywhere in the text. A payload with no such object, or whose
//! object fails the schema check, is a [`AnalysisError::Malformed`].

use serde_json::Value as JsonValue;

use kvar_core::{AnalysisError, AnalysisResult, RawClassification};

/// Parse model output into a [`RawClassification`].
pub fn parse_classification(payload: &str) -> AnalysisResult<RawClassification> {
    let trimmed = payload.trim();
    if trimmed.is_empty() {
        return Err(AnalysisError::EmptyPayload);
    }

    if let Ok(value) = serde_json::from_str::<JsonValue>(trimmed) {
        if value.is_object() {
            return RawClassification::from_value(value);
        }
    }

    match first_json_object(trimmed) {
        Some(value) => RawClassification::from_value(value),
        None => Err(AnalysisError::Malformed(format!(
            "no JSON object in response: {}",
            preview(trimmed)
        ))),
    }
}

/// First well-formed JSON object embedded in `text`.
///
/// Every `{` is tried as a start position; the streaming deserializer stops
/// at the end of the first complete value, so trailing prose or a closing
/// code fence does not matter.
pub fn first_json_object(text: &str) -> Option<JsonValue> {
    text.match_indices('{').find_map(|(start, _)| {
        let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<JsonValue>();
        match stream.next() {
            Some(Ok(value)) if value.is_object() => Some(value),
            _ => None,
        }
    })
}

fn preview(text: &str) -> String {
    const MAX: usize = 120;
    match text.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
