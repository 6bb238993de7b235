//! Client-facing frame protocol.
//!
//! Control frames travel as JSON text with a `type` tag; audio frames travel
//! as raw binary payloads. A successful session is `info audio* final`; a
//! failed one is `info? error`; a cache hit is a single `cached`.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::core::audio::{AudioFormat, ChannelLayout, STREAM_SAMPLE_RATE};

/// Session metadata, sent once before any audio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub transcript: String,
    pub voice_id: String,
    #[serde(rename = "mime")]
    pub content_type: String,
    pub sample_rate: u32,
    pub channel: ChannelLayout,
    pub format: AudioFormat,
}

impl StreamInfo {
    pub fn new(transcript: impl Into<String>, voice_id: impl Into<String>, format: AudioFormat) -> Self {
        Self {
            transcript: transcript.into(),
            voice_id: voice_id.into(),
            content_type: format.content_type().to_string(),
            sample_rate: STREAM_SAMPLE_RATE,
            channel: ChannelLayout::Mono,
            format,
        }
    }
}

/// One frame sent from the relay to its client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamFrame {
    Info(StreamInfo),

    /// Carried as a binary message, never as JSON.
    #[serde(skip)]
    Audio(Bytes),

    Final,

    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },

    /// Short-circuit answer for a cached request. Terminal.
    Cached {
        transcript: String,
        voice_id: String,
        #[serde(rename = "mime")]
        content_type: String,
        /// False when only the transcript was cached
        audio_available: bool,
    },
}

impl StreamFrame {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            code: None,
        }
    }

    /// Whether no frame may follow this one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Final | Self::Error { .. } | Self::Cached { .. })
    }

    /// JSON text of a control frame; `None` for audio.
    pub fn to_json(&self) -> Option<String> {
        match self {
            Self::Audio(_) => None,
            other => serde_json::to_string(other).ok(),
        }
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Info(_) => "info",
            Self::Audio(_) => "audio",
            Self::Final => "final",
            Self::Error { .. } => "error",
            Self::Cached { .. } => "cached",
        }
    }
}
