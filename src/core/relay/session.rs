//! Relay session state machine.
//!
//! ```text
//! AwaitRequest → ResolvingVoice → CacheCheck ─┬─ hit  → cached
//!                                             └─ miss → ResolvingText → UpstreamConnecting
//!                                                       → info audio* final → Persisting
//! ```
//!
//! Any failure before `final` ends the session with a single error frame.
//! Frames go into a bounded channel drained by the transport, so a slow
//! client applies backpressure to the upstream read loop.

use bytes::{Bytes, BytesMut};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use super::frames::{StreamFrame, StreamInfo};
use super::request::{SpeechRequest, StreamRequest};
use super::{RelayError, RelaySettings};
use crate::core::cache::{CacheEntry, CacheKey, ResponseCache};
use crate::core::generator::{GenerationError, TextGenerator};
use crate::core::synthesis::{
    BoxedSynthesisStream, StreamSettings, SynthesisBackend, SynthesisError, UpstreamEvent,
};
use crate::core::voice::{VoiceCatalog, resolve};

/// Capacity of the frame channel between a session and its transport.
pub const FRAME_CHANNEL_CAPACITY: usize = 64;

/// Collaborators shared by every session.
#[derive(Clone)]
pub struct RelayContext {
    pub catalog: Arc<VoiceCatalog>,
    pub cache: ResponseCache,
    pub generator: Arc<dyn TextGenerator>,
    pub backend: Arc<dyn SynthesisBackend>,
    pub settings: RelaySettings,
}

/// How a session ended.
#[derive(Debug, Clone)]
pub enum RelayOutcome {
    Completed { voice_id: String, audio_frames: usize },
    CacheHit { voice_id: String },
    Failed(RelayError),
    /// The client went away; nothing was persisted
    Cancelled,
}

/// Result of a streamed session, persisted after `final` went out.
struct Streamed {
    key: CacheKey,
    voice_id: String,
    transcript: String,
    content_type: String,
    audio: Option<Bytes>,
    audio_frames: usize,
}

enum Progress {
    CacheHit { voice_id: String },
    Streamed(Streamed),
}

async fn send(frames: &mpsc::Sender<StreamFrame>, frame: StreamFrame) -> Result<(), RelayError> {
    frames
        .send(frame)
        .await
        .map_err(|_| RelayError::ClientDisconnected)
}

/// Run the generator under the configured timeout and reject blank output.
pub(super) async fn generate_text(
    context: &RelayContext,
    request: &SpeechRequest,
) -> Result<String, RelayError> {
    let timeout = context.settings.generation_timeout;
    let generation = context
        .generator
        .generate(&request.text, &request.locale, &request.context_files);

    let text = tokio::time::timeout(timeout, generation)
        .await
        .map_err(|_| RelayError::GenerationTimeout(timeout))??;

    let text = text.trim();
    if text.is_empty() {
        return Err(GenerationError::EmptyOutput.into());
    }
    debug!(chars = text.len(), "Text generated");
    Ok(text.to_string())
}

/// One client request relayed to one upstream stream.
pub struct RelaySession {
    id: Uuid,
    context: RelayContext,
}

impl RelaySession {
    pub fn new(context: RelayContext) -> Self {
        Self {
            id: Uuid::new_v4(),
            context,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Run the session to completion, writing frames into `frames`.
    ///
    /// Cancelling `cancel` abandons the session at its next suspension point;
    /// the upstream stream, if open, is dropped and thereby closed.
    pub async fn run(
        self,
        request: StreamRequest,
        frames: mpsc::Sender<StreamFrame>,
        cancel: CancellationToken,
    ) -> RelayOutcome {
        let span = info_span!("relay", session_id = %self.id);
        self.run_inner(request, frames, cancel).instrument(span).await
    }

    async fn run_inner(
        &self,
        request: StreamRequest,
        frames: mpsc::Sender<StreamFrame>,
        cancel: CancellationToken,
    ) -> RelayOutcome {
        let progress = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RelayError::ClientDisconnected),
            result = self.drive(request, &frames) => result,
        };

        match progress {
            Ok(Progress::CacheHit { voice_id }) => RelayOutcome::CacheHit { voice_id },
            Ok(Progress::Streamed(done)) => {
                info!(voice_id = %done.voice_id, audio_frames = done.audio_frames, "Relay session completed");
                let voice_id = done.voice_id.clone();
                let audio_frames = done.audio_frames;
                self.persist(done).await;
                RelayOutcome::Completed {
                    voice_id,
                    audio_frames,
                }
            }
            Err(RelayError::ClientDisconnected) => {
                info!("Client disconnected, relay session abandoned");
                RelayOutcome::Cancelled
            }
            Err(e) => {
                warn!(error = %e, code = e.code(), "Relay session failed");
                // The client may already be gone; nothing else to do then.
                let _ = frames.send(e.to_frame()).await;
                RelayOutcome::Failed(e)
            }
        }
    }

    async fn drive(
        &self,
        request: StreamRequest,
        frames: &mpsc::Sender<StreamFrame>,
    ) -> Result<Progress, RelayError> {
        let request = request.validate()?;

        let voice_id = resolve(
            &self.context.catalog,
            Some(&request.locale),
            request.style.as_deref(),
            request.voice_override.as_deref(),
        )?;

        let key = request.cache_key(&voice_id);
        debug!(voice_id = %voice_id, key = %key.short(), "Voice resolved");

        if let Some(hit) = self.context.cache.lookup(&key).await {
            info!(voice_id = %voice_id, key = %key.short(), audio = hit.has_audio(), "Serving cached response");
            send(
                frames,
                StreamFrame::Cached {
                    audio_available: hit.has_audio(),
                    transcript: hit.transcript,
                    voice_id: voice_id.clone(),
                    content_type: hit.content_type,
                },
            )
            .await?;
            return Ok(Progress::CacheHit { voice_id });
        }

        let transcript = self.generate(&request).await?;

        let settings = StreamSettings::new(&voice_id, request.style.clone(), request.format);
        let mut stream = self.open_upstream(&settings, &transcript).await?;

        let info = StreamInfo::new(&transcript, &voice_id, request.format);
        let content_type = info.content_type.clone();
        send(frames, StreamFrame::Info(info)).await?;

        let mut accumulated = self.context.settings.accumulate_audio.then(BytesMut::new);
        let mut audio_frames = 0usize;
        loop {
            match stream.next_event().await {
                Some(Ok(UpstreamEvent::Audio(chunk))) => {
                    if let Some(buf) = accumulated.as_mut() {
                        buf.extend_from_slice(&chunk);
                    }
                    audio_frames += 1;
                    send(frames, StreamFrame::Audio(chunk)).await?;
                }
                Some(Ok(UpstreamEvent::Final)) => break,
                Some(Err(e)) => return Err(RelayError::UpstreamFailed(e)),
                None => return Err(RelayError::UpstreamFailed(SynthesisError::Closed)),
            }
        }

        stream.close().await;
        send(frames, StreamFrame::Final).await?;

        Ok(Progress::Streamed(Streamed {
            key,
            voice_id,
            transcript,
            content_type,
            audio: accumulated.map(BytesMut::freeze),
            audio_frames,
        }))
    }

    async fn generate(&self, request: &SpeechRequest) -> Result<String, RelayError> {
        generate_text(&self.context, request).await
    }

    /// Open the upstream stream and send the voice configuration and text.
    async fn open_upstream(
        &self,
        settings: &StreamSettings,
        text: &str,
    ) -> Result<BoxedSynthesisStream, RelayError> {
        let timeout = self.context.settings.connect_timeout;
        let connect = async {
            let mut stream = self.context.backend.open_stream(settings).await?;
            stream.send_voice_config(settings).await?;
            stream.send_text(text, true).await?;
            Ok::<_, SynthesisError>(stream)
        };

        tokio::time::timeout(timeout, connect)
            .await
            .map_err(|_| RelayError::UpstreamUnavailable(SynthesisError::ConnectTimeout(timeout)))?
            .map_err(RelayError::UpstreamUnavailable)
    }

    async fn persist(&self, done: Streamed) {
        let entry = CacheEntry {
            transcript: done.transcript,
            audio: done.audio,
            content_type: done.content_type,
        };
        self.context.cache.store(&done.key, entry).await;
    }
}
