//! Prompt construction for the classification services.
//!
//! The system prompt carries the output schema and the closed taxonomy. The
//! vision prompt additionally carries the text-primacy contract: the
//! reporter's own words decide category and priority, photos only add detail,
//! and the reasoning states the reported problem before anything seen in the
//! photos.

use kvar_core::{Category, Room, TextAnalysisRequest, VisionAnalysisRequest};

/// JSON schema every response must follow.
pub const OUTPUT_SCHEMA: &str = r#"{
  "category": string,
  "priority": "low" | "medium" | "high" | "urgent",
  "confidence": number between 0 and 1,
  "reasoning": string,
  "room": string,
  "estimatedCost": string,
  "estimatedTime": string,
  "solution": string,
  "imageSummary": string (only when photos were provided)
}"#;

/// System prompt shared by the text and vision analyzers.
pub fn system_prompt() -> String {
    let categories = Category::ALL
        .iter()
        .map(|c| format!("\"{}\"", c.as_str()))
        .collect::<Vec<_>>()
        .join(", ");
    let rooms = Room::ALL
        .iter()
        .map(|r| format!("\"{}\"", r.as_str()))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "You triage maintenance reports from tenants of residential buildings in Croatia.\n\
         Classify each report and answer with a single JSON object and nothing else:\n\
         {OUTPUT_SCHEMA}\n\n\
         Allowed categories: {categories}.\n\
         Allowed rooms: {rooms}.\n\
         Use \"Other\" when nothing else fits.\n\
         Priority guide: \"urgent\" for active leaks, flooding, gas, fire, exposed live wiring or \
         anyone trapped; \"high\" when a unit is unusable (no heating, no power, broken lock); \
         \"medium\" for functional defects; \"low\" for cosmetic issues.\n\
         Write reasoning, estimatedCost, estimatedTime and solution in Croatian. \
         estimatedCost is a EUR range, estimatedTime a duration."
    )
}

/// User prompt for a text-only classification.
pub fn text_prompt(request: &TextAnalysisRequest) -> String {
    let mut prompt = format!("Tenant report:\n\"\"\"\n{}\n\"\"\"", request.text.trim());
    if let Some(hint) = request.room_hint.as_deref() {
        prompt.push_str(&format!("\nRoom selected in the form: {}", hint.trim()));
    }
    prompt
}

/// User prompt for a multimodal classification.
pub fn vision_prompt(request: &VisionAnalysisRequest<'_>) -> String {
    let count = request.images.len();
    let text = request.text.trim();

    let mut prompt = if text.is_empty() {
        format!(
            "The tenant attached {count} photo(s) and no description. \
             Classify the problem visible in the photos."
        )
    } else {
        format!(
            "Tenant report:\n\"\"\"\n{text}\n\"\"\"\n\
             The tenant also attached {count} photo(s).\n\
             Rules:\n\
             1. The problem the tenant describes is the issue being reported. Derive category \
             and priority from the tenant's text.\n\
             2. Use the photos only to add detail (location, extent, severity). Never replace \
             the tenant's problem with a different one seen in a photo.\n\
             3. The reasoning must first restate the tenant's reported problem, then mention \
             what the photos add."
        )
    };
    if let Some(hint) = request.room_hint {
        prompt.push_str(&format!("\nRoom selected in the form: {}", hint.trim()));
    }
    prompt.push_str(
        "\nAlso fill imageSummary with one sentence describing only what the photos show.",
    );
    prompt
}
