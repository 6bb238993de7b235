//! Content-addressed cache keys.

use sha2::{Digest, Sha256};
use std::fmt;

use crate::core::audio::AudioFormat;

/// Placeholder hashed in place of absent or blank fields.
pub const ABSENT_FIELD: &str = "\u{0}none";

/// Hex-encoded SHA-256 digest of a normalized request tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading characters of the digest, for log lines.
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }

    /// Accept an existing digest, e.g. a file stem read back from disk.
    pub fn from_hex(hex_digest: &str) -> Option<Self> {
        let valid = hex_digest.len() == 64 && hex_digest.bytes().all(|b| b.is_ascii_hexdigit());
        valid.then(|| Self(hex_digest.to_ascii_lowercase()))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn normalize(field: Option<&str>) -> &str {
    match field.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => ABSENT_FIELD,
    }
}

/// Compute the cache key of a request.
///
/// Fields are hashed as an ordered JSON array so that no two distinct tuples
/// share an encoding. Only the first context file takes part in the key.
pub fn compute_key(
    text: &str,
    locale: Option<&str>,
    file_path: Option<&str>,
    voice: Option<&str>,
    style: Option<&str>,
    format: AudioFormat,
) -> CacheKey {
    let fields = [
        normalize(Some(text)),
        normalize(locale),
        normalize(file_path),
        normalize(voice),
        normalize(style),
        format.as_str(),
    ];
    // Serializing an array of &str cannot fail.
    let encoded = serde_json::to_vec(&fields).unwrap_or_default();
    let digest = Sha256::digest(&encoded);
    CacheKey(hex::encode(digest))
}
