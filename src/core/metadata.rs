//! Free-form metadata attached to a CIFTI matrix.
//!
//! Metadata is stored as ordered key-value pairs of strings. Insertion
//! order is kept so that a header serializes to the same bytes every time.

use smallvec::SmallVec;
use std::fmt;

/// Metadata storage - key-value pairs of strings.
///
/// Uses SmallVec optimization for the common case of few entries.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct MetaData {
    entries: SmallVec<[(String, String); 4]>,
}

impl MetaData {
    /// Create empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a metadata value. Existing keys keep their position.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();

        for (k, v) in &mut self.entries {
            if k == &key {
                *v = value;
                return;
            }
        }
        self.entries.push((key, value));
    }

    /// Get a metadata value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over key-value pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    // === Keys written by the assembler ===

    /// Requested surface target (e.g. "fsaverage5").
    pub const TARGET_SURFACE_KEY: &'static str = "target_surface";

    /// Requested volume target (e.g. "MNI152NLin2009cAsym").
    pub const TARGET_VOLUME_KEY: &'static str = "target_volume";

    /// Provenance URL of the label atlas.
    pub const DOWNLOAD_LINK_KEY: &'static str = "download_link";

    /// Get the surface target.
    pub fn target_surface(&self) -> Option<&str> {
        self.get(Self::TARGET_SURFACE_KEY)
    }

    /// Get the volume target.
    pub fn target_volume(&self) -> Option<&str> {
        self.get(Self::TARGET_VOLUME_KEY)
    }

    /// Get the atlas download link.
    pub fn download_link(&self) -> Option<&str> {
        self.get(Self::DOWNLOAD_LINK_KEY)
    }
}

impl fmt::Debug for MetaData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_basic() {
        let mut meta = MetaData::new();
        meta.set("key1", "value1");
        meta.set("key2", "value2");

        assert_eq!(meta.get("key1"), Some("value1"));
        assert_eq!(meta.get("key2"), Some("value2"));
        assert_eq!(meta.get("key3"), None);
        assert_eq!(meta.iter().count(), 2);
    }

    #[test]
    fn test_metadata_update_keeps_order() {
        let mut meta = MetaData::new();
        meta.set(MetaData::TARGET_SURFACE_KEY, "fsaverage5");
        meta.set(MetaData::TARGET_VOLUME_KEY, "MNI152NLin2009cAsym");
        meta.set(MetaData::TARGET_SURFACE_KEY, "fsaverage6");

        let keys: Vec<&str> = meta.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["target_surface", "target_volume"]);
        assert_eq!(meta.target_surface(), Some("fsaverage6"));
    }

    #[test]
    fn test_metadata_lookup() {
        let mut meta = MetaData::new();
        meta.set("a", "1");
        assert_eq!(meta.get("a"), Some("1"));
        assert!(meta.get("b").is_none());
        assert_eq!(meta.iter().count(), 1);
    }
}
