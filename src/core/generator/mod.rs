//! Text generation: turns a raw user prompt into speech-ready text.

mod gemini;
pub mod prompt;

use async_trait::async_trait;
use thiserror::Error;

pub use gemini::{GEMINI_BASE_URL, GEMINI_MODEL, GeminiConfig, GeminiGenerator};

/// Errors returned by a [`TextGenerator`].
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("Text generator API key not set")]
    MissingCredentials,

    #[error("Text generator request failed: {0}")]
    Transport(String),

    #[error("Text generator returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Text generator returned empty text")]
    EmptyOutput,
}

pub type GenerationResult<T> = Result<T, GenerationError>;

/// Produces the text to be spoken for a prompt.
///
/// Called once per uncached request. Implementations must be safe to share
/// between sessions.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        locale: &str,
        context_files: &[String],
    ) -> GenerationResult<String>;
}
