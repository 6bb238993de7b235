//! Audio format constants shared by the relay, the cache and playback.

use serde::{Deserialize, Serialize};

/// Sample rate requested from the upstream streaming backend.
pub const STREAM_SAMPLE_RATE: u32 = 44_100;

/// Length of the canonical RIFF/WAVE header prefixed to the first streamed chunk.
pub const WAV_HEADER_LEN: usize = 44;

/// Output container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AudioFormat {
    #[default]
    Wav,
    Mp3,
}

impl AudioFormat {
    /// Parse a format name case-insensitively; `None` when unsupported.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wav" | "wave" => Some(Self::Wav),
            "mp3" | "mpeg" => Some(Self::Mp3),
            _ => None,
        }
    }

    /// Wire name used by the upstream backend and in cache keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wav => "WAV",
            Self::Mp3 => "MP3",
        }
    }

    /// MIME type of a response in this format.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
            Self::Mp3 => "audio/mpeg",
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Channel layout of the streamed audio. Only mono is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChannelLayout {
    #[default]
    Mono,
}

impl ChannelLayout {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mono => "MONO",
        }
    }

    pub fn channels(&self) -> u16 {
        match self {
            Self::Mono => 1,
        }
    }
}
