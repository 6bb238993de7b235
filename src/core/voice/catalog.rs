//! In-memory voice catalog.
//!
//! The catalog maps an upper-cased locale key (e.g. `EN-US`) to the ordered
//! list of voices listed under it, plus a reserved `multi-locale` bucket whose
//! entries declare every locale they can speak. It is loaded once at startup
//! and shared read-only between all sessions behind an `Arc`.
//!
//! # JSON format
//!
//! ```json
//! {
//!   "en-US": [
//!     { "id": "en-US-natalie", "name": "Natalie", "styles": ["Promo", "Conversational"] }
//!   ],
//!   "multi-locale": [
//!     { "id": "multi-ava", "locales": ["en-US", "es-ES", "fr-FR"] }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use thiserror::Error;

/// Normalized key of the reserved bucket holding voices that span several locales.
pub const MULTI_LOCALE_BUCKET: &str = "MULTI-LOCALE";

/// Errors raised while loading a voice catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read voice catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Voice catalog parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Voice catalog entry under '{bucket}' has an empty id")]
    EmptyId { bucket: String },

    #[error("Duplicate voice id '{0}' in voice catalog")]
    DuplicateId(String),
}

/// A single synthesis voice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceEntry {
    /// Voice identifier understood by the synthesis backend
    pub id: String,
    /// Human readable name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Style labels supported by this voice (e.g. "Conversational", "Promo")
    #[serde(default)]
    pub styles: Vec<String>,
    /// Locales this voice can speak, mostly used by multi-locale entries
    #[serde(default)]
    pub locales: Vec<String>,
}

impl VoiceEntry {
    /// Display name, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Whether the declared locale set contains `locale` (case-insensitive).
    pub fn declares_locale(&self, locale: &str) -> bool {
        self.locales.iter().any(|l| l.eq_ignore_ascii_case(locale))
    }

    /// Whether any declared locale starts with `prefix` (case-insensitive).
    pub fn declares_locale_prefix(&self, prefix: &str) -> bool {
        self.locales
            .iter()
            .any(|l| l.to_uppercase().starts_with(prefix))
    }

    /// Whether the style set contains `style` (case-insensitive).
    pub fn has_style(&self, style: &str) -> bool {
        self.styles.iter().any(|s| s.eq_ignore_ascii_case(style))
    }
}

/// Immutable locale → voices table.
///
/// Buckets are stored in a `BTreeMap` so every scan over "all buckets" visits
/// them in the same order, which keeps voice resolution deterministic.
#[derive(Debug, Clone, Default)]
pub struct VoiceCatalog {
    buckets: BTreeMap<String, Vec<VoiceEntry>>,
}

impl VoiceCatalog {
    /// Build a catalog from raw buckets, normalizing keys and validating ids.
    pub fn new<I, K>(buckets: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = (K, Vec<VoiceEntry>)>,
        K: AsRef<str>,
    {
        let mut normalized: BTreeMap<String, Vec<VoiceEntry>> = BTreeMap::new();
        for (key, entries) in buckets {
            let key = key.as_ref().trim().to_uppercase();
            normalized.entry(key).or_default().extend(entries);
        }

        let mut seen = HashSet::new();
        for (bucket, entries) in &normalized {
            for entry in entries {
                if entry.id.trim().is_empty() {
                    return Err(CatalogError::EmptyId {
                        bucket: bucket.clone(),
                    });
                }
                if !seen.insert(entry.id.as_str()) {
                    return Err(CatalogError::DuplicateId(entry.id.clone()));
                }
            }
        }

        Ok(Self {
            buckets: normalized,
        })
    }

    /// Parse a catalog from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let raw: BTreeMap<String, Vec<VoiceEntry>> = serde_json::from_str(json)?;
        Self::new(raw)
    }

    /// Load a catalog from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&contents)
    }

    /// Load from inline JSON when provided, otherwise from `path`.
    pub fn load(inline_json: Option<&str>, path: &Path) -> Result<Self, CatalogError> {
        match inline_json {
            Some(json) if !json.trim().is_empty() => Self::from_json(json),
            _ => Self::from_file(path),
        }
    }

    /// Voices listed directly under `locale_key` (already upper-cased).
    pub fn bucket(&self, locale_key: &str) -> &[VoiceEntry] {
        self.buckets
            .get(locale_key)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Voices in the reserved multi-locale bucket.
    pub fn multi_locale(&self) -> &[VoiceEntry] {
        self.bucket(MULTI_LOCALE_BUCKET)
    }

    /// Iterate over `(bucket key, voices)` in deterministic order.
    pub fn buckets(&self) -> impl Iterator<Item = (&str, &[VoiceEntry])> {
        self.buckets.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Every voice with the key of the bucket it is listed under.
    pub fn all_voices(&self) -> Vec<(&str, &VoiceEntry)> {
        self.buckets()
            .flat_map(|(key, entries)| entries.iter().map(move |e| (key, e)))
            .collect()
    }

    /// Total number of voices.
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"{
        "en-US": [
            { "id": "en-US-natalie", "name": "Natalie", "styles": ["Promo", "Conversational"] }
        ],
        "multi-locale": [
            { "id": "multi-ava", "locales": ["en-US", "es-ES"] }
        ]
    }"#;

    #[test]
    fn test_from_json_normalizes_keys() {
        let catalog = VoiceCatalog::from_json(SAMPLE).unwrap();

        assert_eq!(catalog.bucket("EN-US").len(), 1);
        assert!(catalog.bucket("en-US").is_empty());
        assert_eq!(catalog.multi_locale()[0].id, "multi-ava");
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let json = r#"{
            "en-US": [{ "id": "v1" }],
            "en-GB": [{ "id": "v1" }]
        }"#;
        let err = VoiceCatalog::from_json(json).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateId(id) if id == "v1"));
    }

    #[test]
    fn test_empty_id_rejected() {
        let json = r#"{ "en-US": [{ "id": "  " }] }"#;
        assert!(matches!(
            VoiceCatalog::from_json(json),
            Err(CatalogError::EmptyId { .. })
        ));
    }

    #[test]
    fn test_keys_differing_in_case_are_merged() {
        let json = r#"{
            "en-us": [{ "id": "a" }],
            "EN-US": [{ "id": "b" }]
        }"#;
        let catalog = VoiceCatalog::from_json(json).unwrap();
        assert_eq!(catalog.bucket("EN-US").len(), 2);
    }

    #[test]
    fn test_display_name_falls_back_to_id() {
        let catalog = VoiceCatalog::from_json(SAMPLE).unwrap();
        assert_eq!(catalog.bucket("EN-US")[0].display_name(), "Natalie");
        assert_eq!(catalog.multi_locale()[0].display_name(), "multi-ava");
    }

    #[test]
    fn test_load_prefers_inline_json() {
        let catalog =
            VoiceCatalog::load(Some(SAMPLE), Path::new("/nonexistent/voices.json")).unwrap();
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("voices.json");
        fs::write(&path, SAMPLE).unwrap();

        let catalog = VoiceCatalog::load(None, &path).unwrap();
        assert_eq!(catalog.all_voices().len(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        let err = VoiceCatalog::load(None, Path::new("/nonexistent/voices.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read voice catalog"));
    }
}
