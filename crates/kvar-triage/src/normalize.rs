//! Normalization of raw model output into taxonomy-valid results.
//!
//! Never fails: any parsed [`RawClassification`] maps to a valid
//! [`ClassificationResult`]. Out-of-taxonomy values are coerced to the
//! catch-all members and logged at DEBUG.

use tracing::debug;

use kvar_core::defaults::UNSPECIFIED_CONFIDENCE;
use kvar_core::taxonomy::fold;
use kvar_core::{Category, ClassificationResult, Priority, RawClassification, Room};

/// Reasoning openers that describe the photo before the reporter's problem.
const IMAGE_FIRST_OPENERS: &[&str] = &[
    "na slici",
    "na fotografiji",
    "na fotografijama",
    "the image",
    "the photo",
];

/// Map a raw classification onto the taxonomy.
///
/// `room_hint` is the free-form room from the reporting form; it replaces
/// an `Other` room when it resolves to a taxonomy member.
pub fn normalize(raw: RawClassification, room_hint: Option<&str>) -> ClassificationResult {
    let category = Category::from_synonym(&raw.category).unwrap_or_else(|| {
        debug!(raw = %raw.category, "Unknown category, using Other");
        Category::Other
    });

    let priority = raw
        .priority
        .as_deref()
        .and_then(Priority::from_synonym)
        .unwrap_or_else(|| {
            debug!(raw = ?raw.priority, "Unknown priority, using medium");
            Priority::Medium
        });

    let room = raw
        .room
        .as_deref()
        .and_then(Room::from_synonym)
        .unwrap_or(Room::Other);

    let result = ClassificationResult {
        category,
        priority,
        confidence: clamp_confidence(raw.confidence),
        reasoning: raw.reasoning.unwrap_or_default(),
        room,
        estimated_cost: raw.estimated_cost,
        estimated_time: raw.estimated_time,
        solution: raw.solution,
    };
    apply_room_hint(result, room_hint)
}

/// Confidence in `[0, 1]`; missing or NaN becomes the unspecified default.
pub fn clamp_confidence(confidence: Option<f64>) -> f64 {
    match confidence {
        Some(c) if c.is_finite() => c.clamp(0.0, 1.0),
        Some(c) if c == f64::INFINITY => 1.0,
        Some(c) if c == f64::NEG_INFINITY => 0.0,
        _ => UNSPECIFIED_CONFIDENCE,
    }
}

/// Replace an `Other` room with the reporter's hint when it is a valid room.
pub fn apply_room_hint(
    mut result: ClassificationResult,
    room_hint: Option<&str>,
) -> ClassificationResult {
    if result.room == Room::Other {
        if let Some(room) = room_hint.and_then(Room::from_synonym) {
            result.room = room;
        }
    }
    result
}

/// Whether reasoning opens with the photo instead of the reporter's problem.
///
/// Only meaningful when the request carried text; the caller logs and keeps
/// the result either way.
pub fn reasoning_leads_with_image(reasoning: &str) -> bool {
    let folded = fold(reasoning);
    IMAGE_FIRST_OPENERS.iter().any(|opener| folded.starts_with(opener))
}
