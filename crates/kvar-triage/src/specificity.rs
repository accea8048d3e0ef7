//! Text self-sufficiency heuristic.
//!
//! Decides whether reporter text is concrete enough that attached photos can
//! be skipped. It only ever removes the image step; requests without images
//! or without text never consult it.

use serde::{Deserialize, Serialize};
use tracing::trace;

use kvar_core::defaults;
use kvar_core::taxonomy::fold;

use crate::fallback::{has_stem, has_word};

/// Thresholds and keyword lists of the heuristic.
///
/// Defaults are the tuned production values; override them through the
/// `[triage.specificity]` table rather than in code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecificityConfig {
    /// Text must be strictly longer than this many characters.
    pub min_chars: usize,
    /// At least one of these, or of `whole_words`, must start a word of the text.
    pub keywords: Vec<String>,
    /// Specific keywords that only count as complete words.
    pub whole_words: Vec<String>,
    /// Any of these forces image analysis.
    pub image_required_keywords: Vec<String>,
}

impl Default for SpecificityConfig {
    fn default() -> Self {
        Self {
            min_chars: defaults::SPECIFICITY_MIN_CHARS,
            keywords: defaults::SPECIFICITY_KEYWORDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            whole_words: defaults::SPECIFICITY_WHOLE_WORDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            image_required_keywords: defaults::IMAGE_REQUIRED_KEYWORDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl SpecificityConfig {
    /// Whether `text` alone is specific enough to classify without photos.
    pub fn is_text_self_sufficient(&self, text: &str) -> bool {
        let text = text.trim();
        if text.chars().count() <= self.min_chars {
            return false;
        }
        let folded = fold(text);
        if self
            .image_required_keywords
            .iter()
            .any(|kw| has_stem(&folded, &fold(kw)))
        {
            trace!("Text names an image-required keyword");
            return false;
        }
        let specific = self
            .keywords
            .iter()
            .find(|kw| has_stem(&folded, &fold(kw)))
            .or_else(|| {
                self.whole_words
                    .iter()
                    .find(|w| has_word(&folded, &fold(w)))
            });
        trace!(keyword = ?specific, "Specificity keyword scan");
        specific.is_some()
    }
}
