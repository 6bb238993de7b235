//! Base traits and types for speech synthesis backends.
//!
//! A backend offers two paths:
//!
//! - a bidirectional stream: one voice configuration message, one text
//!   message with an end marker, then audio events until a completion marker
//! - a one-shot call returning the complete audio
//!
//! The relay only depends on these traits, so tests can drive it with an
//! in-process backend.

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;

use crate::core::audio::{AudioFormat, ChannelLayout, STREAM_SAMPLE_RATE};

/// Style sent upstream when the request carries none.
pub const DEFAULT_STYLE: &str = "Conversational";

// =============================================================================
// Error Types
// =============================================================================

/// Errors raised by a synthesis backend.
#[derive(Debug, Clone, Error)]
pub enum SynthesisError {
    /// No API key configured
    #[error("Synthesis API key not set")]
    MissingCredentials,

    /// Could not establish the upstream connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The handshake did not finish in time
    #[error("Connection timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// Transport failure on an established connection
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// The backend reported an error
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// A message could not be decoded
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The stream ended without a completion marker
    #[error("Upstream closed the stream before completion")]
    Closed,

    /// Non-success HTTP status from the one-shot endpoint
    #[error("Synthesis request returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The one-shot endpoint returned neither audio nor an audio URL
    #[error("Synthesis returned no audio")]
    NoAudio,
}

impl SynthesisError {
    /// Whether the error happened before any upstream session existed.
    pub fn is_connect_error(&self) -> bool {
        matches!(
            self,
            Self::MissingCredentials | Self::ConnectionFailed(_) | Self::ConnectTimeout(_)
        )
    }
}

pub type SynthesisResult<T> = Result<T, SynthesisError>;

// =============================================================================
// Request Types
// =============================================================================

/// Parameters of one streaming session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSettings {
    pub voice_id: String,
    pub style: Option<String>,
    pub format: AudioFormat,
    pub sample_rate: u32,
    pub channel: ChannelLayout,
}

impl StreamSettings {
    pub fn new(voice_id: impl Into<String>, style: Option<String>, format: AudioFormat) -> Self {
        Self {
            voice_id: voice_id.into(),
            style,
            format,
            sample_rate: STREAM_SAMPLE_RATE,
            channel: ChannelLayout::Mono,
        }
    }

    /// Requested style, or [`DEFAULT_STYLE`].
    pub fn style_or_default(&self) -> &str {
        self.style
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_STYLE)
    }
}

/// A non-streaming synthesis request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneShotRequest {
    pub text: String,
    pub voice_id: String,
    pub style: Option<String>,
    pub format: AudioFormat,
}

/// Complete audio returned by [`SynthesisBackend::synthesize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedAudio {
    pub audio: Bytes,
    pub content_type: String,
}

/// One event read from an upstream stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamEvent {
    /// Audio payload, forwarded as-is
    Audio(Bytes),
    /// Completion marker; nothing follows
    Final,
}

// =============================================================================
// Traits
// =============================================================================

/// An open upstream streaming session.
///
/// Dropping the stream closes the underlying connection.
#[async_trait]
pub trait SynthesisStream: Send {
    /// Send the voice configuration. Must precede [`send_text`](Self::send_text).
    async fn send_voice_config(&mut self, settings: &StreamSettings) -> SynthesisResult<()>;

    /// Send text; `end` marks the end of input.
    async fn send_text(&mut self, text: &str, end: bool) -> SynthesisResult<()>;

    /// Next event, or `None` once the stream has completed.
    ///
    /// After [`UpstreamEvent::Final`] or an error, returns `None`.
    async fn next_event(&mut self) -> Option<SynthesisResult<UpstreamEvent>>;

    /// Close the connection. Idempotent.
    async fn close(&mut self);
}

pub type BoxedSynthesisStream = Box<dyn SynthesisStream>;

/// A speech synthesis service.
#[async_trait]
pub trait SynthesisBackend: Send + Sync {
    /// Open a streaming session.
    async fn open_stream(&self, settings: &StreamSettings) -> SynthesisResult<BoxedSynthesisStream>;

    /// Synthesize the whole text at once.
    async fn synthesize(&self, request: &OneShotRequest) -> SynthesisResult<SynthesizedAudio>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_default() {
        let settings = StreamSettings::new("v1", None, AudioFormat::Wav);
        assert_eq!(settings.style_or_default(), "Conversational");
        assert_eq!(settings.sample_rate, 44_100);

        let settings = StreamSettings::new("v1", Some("  ".into()), AudioFormat::Wav);
        assert_eq!(settings.style_or_default(), "Conversational");

        let settings = StreamSettings::new("v1", Some("Promo".into()), AudioFormat::Wav);
        assert_eq!(settings.style_or_default(), "Promo");
    }

    #[test]
    fn test_connect_error_classification() {
        assert!(SynthesisError::MissingCredentials.is_connect_error());
        assert!(SynthesisError::ConnectTimeout(Duration::from_secs(1)).is_connect_error());
        assert!(!SynthesisError::Closed.is_connect_error());
        assert!(!SynthesisError::Upstream("x".into()).is_connect_error());
    }
}
