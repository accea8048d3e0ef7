//! Single-slot image description cache.
//!
//! Holds the description derived from the last analyzed image set of one
//! draft report, keyed by the sorted content keys of that set. Image bytes
//! are never retained.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use kvar_core::{content_keys, ImageBlob};

/// The one cached description and the image set it describes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Sorted content keys of the described images.
    pub image_content_keys: Vec<String>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Cache scoped to one draft session. Not shared across sessions.
#[derive(Debug, Clone, Default)]
pub struct ImageDescriptionCache {
    entry: Option<CacheEntry>,
}

impl ImageDescriptionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached description for exactly this image set, in any order.
    pub fn lookup(&self, images: &[ImageBlob]) -> Option<&str> {
        if images.is_empty() {
            return None;
        }
        let entry = self.entry.as_ref()?;
        let keys = content_keys(images);
        trace!(keys = ?keys, stored = ?entry.image_content_keys, "Comparing image content keys");
        if keys == entry.image_content_keys {
            debug!(image_count = images.len(), "Image description cache hit");
            Some(entry.description.as_str())
        } else {
            debug!(image_count = images.len(), "Image description cache miss");
            None
        }
    }

    /// Replace the held entry.
    pub fn store(&mut self, images: &[ImageBlob], description: impl Into<String>) {
        let entry = CacheEntry {
            image_content_keys: content_keys(images),
            description: description.into(),
            created_at: Utc::now(),
        };
        debug!(
            image_count = entry.image_content_keys.len(),
            description_len = entry.description.len(),
            "Storing image description"
        );
        self.entry = Some(entry);
    }

    pub fn entry(&self) -> Option<&CacheEntry> {
        self.entry.as_ref()
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(name: &str, bytes: &[u8]) -> ImageBlob {
        ImageBlob::new(name, bytes.to_vec())
    }

    #[test]
    fn test_store_then_lookup_any_order() {
        let a = image("a.jpg", b"aaa");
        let b = image("b.jpg", b"bbbb");
        let mut cache = ImageDescriptionCache::new();
        cache.store(&[a.clone(), b.clone()], "Mokar strop iznad kade.");

        assert_eq!(cache.lookup(&[a.clone(), b.clone()]), Some("Mokar strop iznad kade."));
        assert_eq!(cache.lookup(&[b, a]), Some("Mokar strop iznad kade."));
    }

    #[test]
    fn test_changed_image_misses() {
        let a = image("a.jpg", b"aaa");
        let b = image("b.jpg", b"bbbb");
        let mut cache = ImageDescriptionCache::new();
        cache.store(&[a.clone(), b.clone()], "opis");

        let b_edited = image("b.jpg", b"bbbc");
        assert_eq!(cache.lookup(&[a.clone(), b_edited]), None);
        assert_eq!(cache.lookup(&[a.clone()]), None);
        assert_eq!(cache.lookup(&[a, b, image("c.jpg", b"c")]), None);
    }

    #[test]
    fn test_store_replaces_entry() {
        let a = image("a.jpg", b"aaa");
        let b = image("b.jpg", b"bbb");
        let mut cache = ImageDescriptionCache::new();
        cache.store(&[a.clone()], "prvi");
        cache.store(&[b.clone()], "drugi");

        assert_eq!(cache.lookup(&[a]), None);
        assert_eq!(cache.lookup(&[b]), Some("drugi"));
        assert_eq!(cache.entry().map(|e| e.image_content_keys.len()), Some(1));
    }

    #[test]
    fn test_empty_image_set_never_hits() {
        let mut cache = ImageDescriptionCache::new();
        cache.store(&[], "nothing");
        assert_eq!(cache.lookup(&[]), None);
    }

    #[test]
    fn test_clear() {
        let a = image("a.jpg", b"aaa");
        let mut cache = ImageDescriptionCache::new();
        assert!(cache.is_empty());
        cache.store(&[a.clone()], "opis");
        assert!(!cache.is_empty());
        cache.clear();
        assert_eq!(cache.lookup(&[a]), None);
    }
}
