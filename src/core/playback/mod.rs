//! Client-side playback of relay sessions.

mod consumer;
mod output;

use thiserror::Error;

pub use consumer::{PlaybackConsumer, PlaybackOutcome, Step, strip_header};
pub use output::{
    AudioOutput, OutputFactory, OutputSpec, PcmWriterFactory, PcmWriterOutput, WavFileFactory,
    WavFileOutput,
};

/// Playback errors. None of them affect the relay.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    #[error("Failed to initialize output device: {0}")]
    DeviceInitFailed(String),

    #[error("Failed to write audio: {0}")]
    Write(String),

    #[error("Unexpected frame: {0}")]
    UnexpectedFrame(&'static str),

    #[error("Frame stream failed: {0}")]
    Transport(String),

    #[error("Frame stream ended before a final or error frame")]
    Truncated,
}
