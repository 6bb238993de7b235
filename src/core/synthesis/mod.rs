//! Speech synthesis backends.

pub mod base;
pub mod messages;
mod murf;

pub use base::{
    BoxedSynthesisStream, DEFAULT_STYLE, OneShotRequest, StreamSettings, SynthesisBackend,
    SynthesisError, SynthesisResult, SynthesisStream, SynthesizedAudio, UpstreamEvent,
};
pub use murf::{MURF_GENERATE_URL, MURF_STREAM_URL, MurfBackend, MurfConfig};
