//! Synthesis relay: bridges one client session to one upstream stream.

pub mod frames;
mod oneshot;
pub mod request;
mod session;

use std::time::Duration;
use thiserror::Error;

use crate::core::generator::GenerationError;
use crate::core::synthesis::SynthesisError;
use crate::core::voice::VoiceError;

pub use frames::{StreamFrame, StreamInfo};
pub use oneshot::{SpokenResponse, speak_once};
pub use request::{DEFAULT_REQUEST_LOCALE, MAX_TEXT_BYTES, SpeechRequest, StreamRequest};
pub use session::{FRAME_CHANNEL_CAPACITY, RelayContext, RelayOutcome, RelaySession};

/// Default bound on the text generation step.
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Default bound on opening and configuring the upstream stream.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Errors that end a relay session.
#[derive(Debug, Clone, Error)]
pub enum RelayError {
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error(transparent)]
    NoVoice(#[from] VoiceError),

    #[error("Text generation failed: {0}")]
    GenerationFailed(#[from] GenerationError),

    #[error("Text generation timed out after {0:?}")]
    GenerationTimeout(Duration),

    #[error("Synthesis backend unavailable: {0}")]
    UpstreamUnavailable(SynthesisError),

    #[error("Synthesis stream failed: {0}")]
    UpstreamFailed(SynthesisError),

    #[error("Client disconnected")]
    ClientDisconnected,
}

impl RelayError {
    /// Stable code carried in error frames.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedRequest(_) => "malformed_request",
            Self::NoVoice(_) => "no_voice_for_locale",
            Self::GenerationFailed(_) | Self::GenerationTimeout(_) => "generation_failed",
            Self::UpstreamUnavailable(_) => "upstream_unavailable",
            Self::UpstreamFailed(_) => "upstream_failed",
            Self::ClientDisconnected => "client_disconnected",
        }
    }

    /// Error frame reporting this failure.
    pub fn to_frame(&self) -> StreamFrame {
        StreamFrame::Error {
            message: self.to_string(),
            code: Some(self.code().to_string()),
        }
    }
}

/// Per-session tunables, built from the server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaySettings {
    pub generation_timeout: Duration,
    pub connect_timeout: Duration,
    /// Keep streamed audio so that cache entries can replay it
    pub accumulate_audio: bool,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            accumulate_audio: false,
        }
    }
}
