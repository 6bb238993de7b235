pub mod audio;
pub mod cache;
pub mod generator;
pub mod playback;
pub mod relay;
pub mod synthesis;
pub mod voice;

// Re-export commonly used types for convenience
pub use audio::{AudioFormat, ChannelLayout, STREAM_SAMPLE_RATE, WAV_HEADER_LEN};

pub use cache::{CacheConfig, CacheEntry, CacheKey, ResponseCache, compute_key};

pub use generator::{GeminiConfig, GeminiGenerator, GenerationError, TextGenerator};

pub use playback::{PlaybackConsumer, PlaybackError, PlaybackOutcome};

pub use relay::{
    RelayContext, RelayError, RelayOutcome, RelaySession, RelaySettings, SpeechRequest,
    SpokenResponse, StreamFrame, StreamInfo, StreamRequest, speak_once,
};

pub use synthesis::{
    MurfBackend, MurfConfig, StreamSettings, SynthesisBackend, SynthesisError, SynthesisStream,
    UpstreamEvent,
};

pub use voice::{VoiceCatalog, VoiceEntry, VoiceError, resolve};
