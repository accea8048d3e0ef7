//! Data model for issue triage requests and results.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

use crate::defaults;
use crate::error::{AnalysisError, Error, Result};
use crate::taxonomy::{Category, Priority, Room};

// =============================================================================
// IMAGES
// =============================================================================

/// A photo attached to an issue report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBlob {
    /// File name as supplied by the uploader.
    pub name: String,
    /// Raw image bytes.
    pub data: Vec<u8>,
}

impl ImageBlob {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Byte length of the image.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Stable identity of this image: `{name}:{len}:{blake3-prefix}`.
    ///
    /// Name and length keep keys readable in logs; the digest makes a
    /// re-upload with different content under the same name a different key.
    pub fn content_key(&self) -> String {
        let hash = blake3::hash(&self.data).to_hex();
        format!(
            "{}:{}:{}",
            self.name,
            self.data.len(),
            &hash.as_str()[..defaults::CONTENT_KEY_HASH_LEN]
        )
    }

    /// MIME type from magic bytes, falling back to the file extension.
    pub fn mime_type(&self) -> &'static str {
        if let Some(kind) = infer::get(&self.data) {
            if kind.matcher_type() == infer::MatcherType::Image {
                return kind.mime_type();
            }
        }
        let ext = self
            .name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "png" => "image/png",
            "gif" => "image/gif",
            "webp" => "image/webp",
            "heic" => "image/heic",
            _ => "image/jpeg",
        }
    }
}

/// Sorted content keys of an image set.
///
/// Sorting makes the key sequence depend on the set of images, not the order
/// in which they were attached.
pub fn content_keys(images: &[ImageBlob]) -> Vec<String> {
    let mut keys: Vec<String> = images.iter().map(ImageBlob::content_key).collect();
    keys.sort();
    keys
}

// =============================================================================
// REQUEST
// =============================================================================

/// Immutable input to one triage run.
#[derive(Debug, Clone, Default)]
pub struct ClassificationRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Free-form room hint from the reporting form.
    pub room: Option<String>,
    pub images: Vec<ImageBlob>,
    /// Description of the current images from an earlier vision call, for
    /// callers that keep it outside of an image description cache.
    pub cached_image_description: Option<String>,
    /// Re-run image analysis even if a cached description or self-sufficient
    /// text would allow skipping it.
    pub force_reanalysis: bool,
}

impl ClassificationRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        self.room = Some(room.into());
        self
    }

    pub fn with_image(mut self, image: ImageBlob) -> Self {
        self.images.push(image);
        self
    }

    pub fn with_images(mut self, images: impl IntoIterator<Item = ImageBlob>) -> Self {
        self.images.extend(images);
        self
    }

    pub fn with_cached_image_description(mut self, description: impl Into<String>) -> Self {
        self.cached_image_description = Some(description.into());
        self
    }

    pub fn forcing_reanalysis(mut self) -> Self {
        self.force_reanalysis = true;
        self
    }

    /// Title and description, trimmed, non-empty parts joined by a newline.
    pub fn combined_text(&self) -> String {
        [self.title.as_deref(), self.description.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn has_text(&self) -> bool {
        !self.combined_text().is_empty()
    }

    pub fn has_images(&self) -> bool {
        !self.images.is_empty()
    }

    /// Caller-supplied cached description, if non-blank.
    pub fn cached_description(&self) -> Option<&str> {
        self.cached_image_description
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Room hint, if non-blank.
    pub fn room_hint(&self) -> Option<&str> {
        self.room.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Reject requests that give the engine nothing to classify.
    pub fn validate(&self) -> Result<()> {
        if self.images.len() > defaults::MAX_IMAGES {
            return Err(Error::InvalidInput(format!(
                "at most {} images per report, got {}",
                defaults::MAX_IMAGES,
                self.images.len()
            )));
        }
        if !self.has_text() && !self.has_images() && self.cached_description().is_none() {
            return Err(Error::InvalidInput(
                "report needs a title, description, photo, or cached image description".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// RAW CLASSIFICATION
// =============================================================================

/// Classification as produced by an external model, before normalization.
///
/// Field values are untrusted: category/priority/room may be outside the
/// taxonomy and confidence may be out of range or missing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawClassification {
    /// Empty when the model sent `null` or a blank value.
    #[serde(deserialize_with = "lenient_category")]
    pub category: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "lenient_confidence")]
    pub confidence: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub reasoning: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub room: Option<String>,
    #[serde(default, alias = "estimated_cost", deserialize_with = "lenient_string")]
    pub estimated_cost: Option<String>,
    #[serde(default, alias = "estimated_time", deserialize_with = "lenient_string")]
    pub estimated_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub solution: Option<String>,
    /// What the photos show, independent of the reporter's text.
    #[serde(default, alias = "image_summary", deserialize_with = "lenient_string")]
    pub image_summary: Option<String>,
}

impl RawClassification {
    /// Validate the shape of a parsed JSON value.
    ///
    /// The value must be an object carrying a `category` key; every field
    /// tolerates `null` and numbers where text is expected.
    pub fn from_value(value: JsonValue) -> std::result::Result<Self, AnalysisError> {
        if !value.is_object() {
            return Err(AnalysisError::Malformed(
                "classification is not a JSON object".to_string(),
            ));
        }
        serde_json::from_value(value).map_err(|e| AnalysisError::Malformed(e.to_string()))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LenientValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Other(JsonValue),
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<LenientValue>::deserialize(deserializer)?;
    Ok(match value {
        Some(LenientValue::Text(s)) if !s.trim().is_empty() => Some(s),
        Some(LenientValue::Number(n)) => Some(n.to_string()),
        Some(LenientValue::Bool(b)) => Some(b.to_string()),
        Some(LenientValue::Other(v)) if !v.is_null() => Some(v.to_string()),
        _ => None,
    })
}

fn lenient_category<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_string(deserializer).map(Option::unwrap_or_default)
}

fn lenient_confidence<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<LenientValue>::deserialize(deserializer)?;
    Ok(match value {
        Some(LenientValue::Number(n)) => Some(n),
        Some(LenientValue::Text(s)) => {
            let s = s.trim();
            match s.strip_suffix('%') {
                Some(pct) => pct.trim().parse::<f64>().ok().map(|p| p / 100.0),
                None => s.parse::<f64>().ok(),
            }
        }
        _ => None,
    })
}

// =============================================================================
// RESULT
// =============================================================================

/// Final, taxonomy-valid classification handed back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub category: Category,
    pub priority: Priority,
    /// Always within `[0, 1]`.
    pub confidence: f64,
    pub reasoning: String,
    pub room: Room,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
}

/// Which branch of the triage state machine produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisPath {
    /// Text analyzer on text alone (no images in the request).
    Text,
    /// Cached image description combined with text, text analyzer.
    CachedDescription,
    /// Images present but text was specific enough; text analyzer.
    SpecificTextOnly,
    /// Vision analyzer on text and images.
    Vision,
    /// Vision analyzer failed; text analyzer on text alone.
    VisionFallbackToText,
    /// Every analyzer failed or was unusable; deterministic rules.
    Deterministic,
}

impl std::fmt::Display for AnalysisPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::CachedDescription => write!(f, "cached_description"),
            Self::SpecificTextOnly => write!(f, "specific_text_only"),
            Self::Vision => write!(f, "vision"),
            Self::VisionFallbackToText => write!(f, "vision_fallback_to_text"),
            Self::Deterministic => write!(f, "deterministic"),
        }
    }
}

/// Output of a completed triage run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageOutcome {
    pub result: ClassificationResult,
    /// New description of the current images, for the caller to cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived_image_description: Option<String>,
    pub path: AnalysisPath,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    #[test]
    fn test_content_key_format() {
        let image = ImageBlob::new("slavina.jpg", vec![1u8, 2, 3]);
        let key = image.content_key();
        assert!(key.starts_with("slavina.jpg:3:"));
        assert_eq!(
            key.len(),
            "slavina.jpg:3:".len() + defaults::CONTENT_KEY_HASH_LEN
        );
    }

    #[test]
    fn test_content_key_changes_with_bytes() {
        let a = ImageBlob::new("a.jpg", vec![1u8, 2, 3]);
        let b = ImageBlob::new("a.jpg", vec![1u8, 2, 4]);
        assert_ne!(a.content_key(), b.content_key());
    }

    #[test]
    fn test_content_keys_are_order_independent() {
        let a = ImageBlob::new("a.jpg", vec![1u8]);
        let b = ImageBlob::new("b.jpg", vec![2u8, 2]);
        assert_eq!(
            content_keys(&[a.clone(), b.clone()]),
            content_keys(&[b, a])
        );
    }

    #[test]
    fn test_mime_type_from_magic_bytes() {
        let image = ImageBlob::new("photo.jpg", PNG_MAGIC.to_vec());
        assert_eq!(image.mime_type(), "image/png");
    }

    #[test]
    fn test_mime_type_from_extension() {
        assert_eq!(ImageBlob::new("x.WEBP", vec![0u8]).mime_type(), "image/webp");
        assert_eq!(ImageBlob::new("noext", vec![0u8]).mime_type(), "image/jpeg");
    }

    #[test]
    fn test_combined_text_skips_blank_parts() {
        let req = ClassificationRequest::new()
            .with_title("  Curi slavina ")
            .with_description("   ");
        assert_eq!(req.combined_text(), "Curi slavina");

        let req = ClassificationRequest::new()
            .with_title("Curi slavina")
            .with_description("U kuhinji od jutros");
        assert_eq!(req.combined_text(), "Curi slavina\nU kuhinji od jutros");
    }

    #[test]
    fn test_validate_rejects_empty_request() {
        let err = ClassificationRequest::new().validate().unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let blank = ClassificationRequest::new()
            .with_title(" ")
            .with_cached_image_description("  ");
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_any_single_source() {
        assert!(ClassificationRequest::new().with_title("x").validate().is_ok());
        assert!(ClassificationRequest::new()
            .with_image(ImageBlob::new("a.jpg", vec![1u8]))
            .validate()
            .is_ok());
        assert!(ClassificationRequest::new()
            .with_cached_image_description("Mrlja vlage na stropu.")
            .validate()
            .is_ok());
    }

    #[test]
    fn test_validate_rejects_too_many_images() {
        let images = (0..=defaults::MAX_IMAGES).map(|i| ImageBlob::new(format!("{i}.jpg"), vec![i as u8]));
        let req = ClassificationRequest::new().with_title("x").with_images(images);
        assert!(matches!(req.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_raw_classification_full_object() {
        let raw = RawClassification::from_value(json!({
            "category": "Voda/Vodovod",
            "priority": "urgent",
            "confidence": 0.9,
            "reasoning": "Korisnik prijavljuje curenje.",
            "room": "kupaonica",
            "estimatedCost": 150,
            "estimatedTime": "2 sata",
            "solution": "Zamijeniti brtvu",
            "imageSummary": "Mokar pod ispod umivaonika."
        }))
        .unwrap();
        assert_eq!(raw.category, "Voda/Vodovod");
        assert_eq!(raw.priority.as_deref(), Some("urgent"));
        assert_eq!(raw.confidence, Some(0.9));
        assert_eq!(raw.room.as_deref(), Some("kupaonica"));
        assert_eq!(raw.estimated_cost.as_deref(), Some("150"));
        assert_eq!(raw.image_summary.as_deref(), Some("Mokar pod ispod umivaonika."));
    }

    #[test]
    fn test_raw_classification_lenient_fields() {
        let raw = RawClassification::from_value(json!({
            "category": "Elektrika",
            "confidence": "85%",
            "estimated_time": "1 dan",
            "reasoning": null,
            "room": ""
        }))
        .unwrap();
        assert_eq!(raw.confidence, Some(0.85));
        assert_eq!(raw.estimated_time.as_deref(), Some("1 dan"));
        assert_eq!(raw.reasoning, None);
        assert_eq!(raw.room, None);
        assert_eq!(raw.priority, None);
    }

    #[test]
    fn test_raw_classification_rejects_non_objects() {
        assert!(matches!(
            RawClassification::from_value(json!(["Voda/Vodovod"])),
            Err(AnalysisError::Malformed(_))
        ));
    }

    #[test]
    fn test_raw_classification_requires_category() {
        assert!(matches!(
            RawClassification::from_value(json!({"priority": "high"})),
            Err(AnalysisError::Malformed(_))
        ));
    }

    #[test]
    fn test_null_category_keeps_other_fields() {
        let raw = RawClassification::from_value(json!({
            "category": null,
            "priority": "urgent",
            "room": "kuhinja",
            "confidence": 0.6
        }))
        .unwrap();
        assert_eq!(raw.category, "");
        assert_eq!(raw.priority.as_deref(), Some("urgent"));
        assert_eq!(raw.room.as_deref(), Some("kuhinja"));
        assert_eq!(raw.confidence, Some(0.6));
    }

    #[test]
    fn test_result_serializes_camel_case_and_skips_none() {
        let result = ClassificationResult {
            category: Category::Water,
            priority: Priority::Urgent,
            confidence: 0.8,
            reasoning: "Curenje vode.".to_string(),
            room: Room::Bathroom,
            estimated_cost: Some("100 EUR".to_string()),
            estimated_time: None,
            solution: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["category"], "Voda/Vodovod");
        assert_eq!(json["estimatedCost"], "100 EUR");
        assert!(json.get("estimatedTime").is_none());
    }

    #[test]
    fn test_analysis_path_display() {
        assert_eq!(AnalysisPath::VisionFallbackToText.to_string(), "vision_fallback_to_text");
        assert_eq!(
            serde_json::to_string(&AnalysisPath::CachedDescription).unwrap(),
            "\"cached_description\""
        );
    }
}
