//! Two-tier response cache.
//!
//! The memory tier is a bounded `moka` cache. When a cache directory is
//! configured, every entry is also written to `<dir>/<key>.json` so that
//! responses survive restarts. Caching is purely an optimization: disk
//! errors are logged and turned into misses (reads) or no-ops (writes).

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

use super::key::CacheKey;

/// Default number of entries kept in memory.
pub const DEFAULT_MAX_ENTRIES: u64 = 1024;

/// A cached response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub transcript: String,
    /// Absent when a streaming session cached only its transcript.
    pub audio: Option<Bytes>,
    pub content_type: String,
}

impl CacheEntry {
    pub fn transcript_only(transcript: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            audio: None,
            content_type: content_type.into(),
        }
    }

    /// Whether audio can be replayed from this entry.
    pub fn has_audio(&self) -> bool {
        self.audio.as_ref().is_some_and(|a| !a.is_empty())
    }
}

/// On-disk representation.
#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    transcript: String,
    audio_b64: Option<String>,
    mime: String,
}

impl From<&CacheEntry> for StoredEntry {
    fn from(entry: &CacheEntry) -> Self {
        Self {
            transcript: entry.transcript.clone(),
            audio_b64: entry.audio.as_ref().map(|a| BASE64.encode(a)),
            mime: entry.content_type.clone(),
        }
    }
}

impl TryFrom<StoredEntry> for CacheEntry {
    type Error = base64::DecodeError;

    fn try_from(stored: StoredEntry) -> Result<Self, Self::Error> {
        let audio = stored
            .audio_b64
            .map(|b64| BASE64.decode(b64).map(Bytes::from))
            .transpose()?;
        Ok(Self {
            transcript: stored.transcript,
            audio,
            content_type: stored.mime,
        })
    }
}

/// Cache settings.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Directory for persisted entries; memory only when `None`
    pub path: Option<PathBuf>,
    /// Time to live of in-memory entries
    pub ttl: Option<Duration>,
    pub max_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: None,
            ttl: None,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

/// Content-addressed response cache, safe to share between sessions.
#[derive(Clone)]
pub struct ResponseCache {
    memory: Cache<CacheKey, CacheEntry>,
    dir: Option<PathBuf>,
}

impl ResponseCache {
    pub fn new(config: CacheConfig) -> Self {
        let mut builder = Cache::builder().max_capacity(config.max_entries);
        if let Some(ttl) = config.ttl {
            builder = builder.time_to_live(ttl);
        }
        Self {
            memory: builder.build(),
            dir: config.path,
        }
    }

    /// Memory-only cache with default capacity.
    pub fn in_memory() -> Self {
        Self::new(CacheConfig::default())
    }

    /// Fetch an entry. Absent is not an error.
    pub async fn lookup(&self, key: &CacheKey) -> Option<CacheEntry> {
        if let Some(entry) = self.memory.get(key).await {
            debug!(key = %key.short(), "Cache hit (memory)");
            return Some(entry);
        }

        let entry = self.read_disk(key).await?;
        debug!(key = %key.short(), "Cache hit (disk)");
        self.memory.insert(key.clone(), entry.clone()).await;
        Some(entry)
    }

    /// Insert or overwrite an entry. Never fails the caller.
    pub async fn store(&self, key: &CacheKey, entry: CacheEntry) {
        self.write_disk(key, &entry).await;
        self.memory.insert(key.clone(), entry).await;
        debug!(key = %key.short(), "Cache entry stored");
    }

    fn entry_path(&self, key: &CacheKey) -> Option<PathBuf> {
        self.dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.json", key.as_str())))
    }

    async fn read_disk(&self, key: &CacheKey) -> Option<CacheEntry> {
        let path = self.entry_path(key)?;
        let contents = match tokio::fs::read(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read cache entry");
                return None;
            }
        };

        let stored: StoredEntry = match serde_json::from_slice(&contents) {
            Ok(s) => s,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupt cache entry, ignoring");
                return None;
            }
        };

        match CacheEntry::try_from(stored) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cache entry has invalid audio, ignoring");
                None
            }
        }
    }

    async fn write_disk(&self, key: &CacheKey, entry: &CacheEntry) {
        let (Some(dir), Some(path)) = (self.dir.as_ref(), self.entry_path(key)) else {
            return;
        };

        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            warn!(dir = %dir.display(), error = %e, "Failed to create cache directory");
            return;
        }

        let body = match serde_json::to_vec(&StoredEntry::from(entry)) {
            Ok(b) => b,
            Err(e) => {
                warn!(error = %e, "Failed to encode cache entry");
                return;
            }
        };

        // Write-then-rename so readers never see a partial document.
        let tmp = path.with_extension(format!("json.{}.tmp", uuid::Uuid::new_v4()));
        if let Err(e) = tokio::fs::write(&tmp, &body).await {
            warn!(path = %tmp.display(), error = %e, "Failed to write cache entry");
            return;
        }
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            warn!(path = %path.display(), error = %e, "Failed to persist cache entry");
            let _ = tokio::fs::remove_file(&tmp).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::audio::AudioFormat;
    use crate::core::cache::compute_key;
    use tempfile::TempDir;

    fn key(text: &str) -> CacheKey {
        compute_key(text, Some("en-US"), None, Some("v1"), None, AudioFormat::Wav)
    }

    fn entry_with_audio() -> CacheEntry {
        CacheEntry {
            transcript: "Hello there".to_string(),
            audio: Some(Bytes::from_static(b"RIFF....WAVE")),
            content_type: "audio/wav".to_string(),
        }
    }

    #[tokio::test]
    async fn test_memory_round_trip() {
        let cache = ResponseCache::in_memory();
        let k = key("hello");

        assert!(cache.lookup(&k).await.is_none());
        cache.store(&k, entry_with_audio()).await;
        assert_eq!(cache.lookup(&k).await, Some(entry_with_audio()));
    }

    #[tokio::test]
    async fn test_store_overwrites() {
        let cache = ResponseCache::in_memory();
        let k = key("hello");

        cache.store(&k, entry_with_audio()).await;
        let replacement = CacheEntry::transcript_only("Second", "audio/wav");
        cache.store(&k, replacement.clone()).await;

        assert_eq!(cache.lookup(&k).await, Some(replacement));
    }

    #[tokio::test]
    async fn test_transcript_only_entry() {
        let cache = ResponseCache::in_memory();
        let k = key("hello");
        cache
            .store(&k, CacheEntry::transcript_only("Just text", "audio/wav"))
            .await;

        let hit = cache.lookup(&k).await.unwrap();
        assert!(!hit.has_audio());
        assert!(hit.audio.is_none());
        assert_eq!(hit.transcript, "Just text");
    }

    #[tokio::test]
    async fn test_disk_persistence_survives_new_instance() {
        let temp_dir = TempDir::new().unwrap();
        let config = CacheConfig {
            path: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        };
        let k = key("persisted");

        ResponseCache::new(config.clone())
            .store(&k, entry_with_audio())
            .await;

        let reopened = ResponseCache::new(config);
        assert_eq!(reopened.lookup(&k).await, Some(entry_with_audio()));
        assert!(temp_dir.path().join(format!("{k}.json")).exists());
    }

    #[tokio::test]
    async fn test_corrupt_disk_entry_is_a_miss() {
        let temp_dir = TempDir::new().unwrap();
        let k = key("corrupt");
        std::fs::write(temp_dir.path().join(format!("{k}.json")), b"{not json").unwrap();

        let cache = ResponseCache::new(CacheConfig {
            path: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        });
        assert!(cache.lookup(&k).await.is_none());
    }

    #[tokio::test]
    async fn test_unwritable_dir_does_not_fail_store() {
        let temp_dir = TempDir::new().unwrap();
        // A regular file where the directory should be.
        let blocker = temp_dir.path().join("blocked");
        std::fs::write(&blocker, b"").unwrap();

        let cache = ResponseCache::new(CacheConfig {
            path: Some(blocker.join("cache")),
            ..Default::default()
        });
        let k = key("hello");
        cache.store(&k, entry_with_audio()).await;

        // Still served from memory.
        assert_eq!(cache.lookup(&k).await, Some(entry_with_audio()));
    }

    #[test]
    fn test_stored_entry_null_audio_format() {
        let stored = StoredEntry::from(&CacheEntry::transcript_only("t", "audio/wav"));
        let json = serde_json::to_value(&stored).unwrap();
        assert!(json["audio_b64"].is_null());
        assert_eq!(json["mime"], "audio/wav");
    }
}
