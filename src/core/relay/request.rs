//! Client request parsing and validation.

use serde::{Deserialize, Serialize};

use super::RelayError;
use crate::core::audio::AudioFormat;
use crate::core::cache::{CacheKey, compute_key};

/// Locale assumed when the request names none.
pub const DEFAULT_REQUEST_LOCALE: &str = "en-US";

/// Maximum prompt size in bytes.
pub const MAX_TEXT_BYTES: usize = 16 * 1024;

/// Request as received on the wire. Every field except `text` is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRequest {
    #[serde(default)]
    pub text: String,

    #[serde(default, rename = "language", alias = "locale", alias = "lang")]
    pub locale: Option<String>,

    #[serde(default)]
    pub style: Option<String>,

    #[serde(default, alias = "voiceId")]
    pub voice_id: Option<String>,

    #[serde(default)]
    pub format: Option<String>,

    #[serde(default)]
    pub files: Vec<String>,
}

/// A validated, immutable request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    pub text: String,
    pub locale: String,
    pub style: Option<String>,
    pub voice_override: Option<String>,
    pub format: AudioFormat,
    pub context_files: Vec<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl StreamRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Validate and normalize into a [`SpeechRequest`].
    pub fn validate(self) -> Result<SpeechRequest, RelayError> {
        let text = self.text.trim();
        if text.is_empty() {
            return Err(RelayError::MalformedRequest("text is required".to_string()));
        }
        if text.len() > MAX_TEXT_BYTES {
            return Err(RelayError::MalformedRequest(format!(
                "text exceeds {MAX_TEXT_BYTES} bytes"
            )));
        }

        let format = match non_blank(self.format) {
            None => AudioFormat::default(),
            Some(name) => AudioFormat::parse(&name).ok_or_else(|| {
                RelayError::MalformedRequest(format!("unsupported format '{name}'"))
            })?,
        };

        let context_files = self
            .files
            .into_iter()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();

        Ok(SpeechRequest {
            text: text.to_string(),
            locale: non_blank(self.locale).unwrap_or_else(|| DEFAULT_REQUEST_LOCALE.to_string()),
            style: non_blank(self.style),
            voice_override: non_blank(self.voice_id),
            format,
            context_files,
        })
    }
}

impl SpeechRequest {
    /// Cache key of this request once its voice is known.
    pub fn cache_key(&self, voice_id: &str) -> CacheKey {
        compute_key(
            &self.text,
            Some(&self.locale),
            self.context_files.first().map(String::as_str),
            Some(voice_id),
            self.style.as_deref(),
            self.format,
        )
    }
}
