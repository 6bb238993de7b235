//! Non-streaming request path.
//!
//! Shares cache keys with streaming sessions, so a prompt answered on one
//! path is a hit on the other.

use bytes::Bytes;
use tracing::{Instrument, debug, info, info_span};
use uuid::Uuid;

use super::RelayError;
use super::request::StreamRequest;
use super::session::{RelayContext, generate_text};
use crate::core::cache::CacheEntry;
use crate::core::synthesis::OneShotRequest;
use crate::core::voice::resolve;

/// Complete answer to a non-streaming request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpokenResponse {
    pub voice_id: String,
    pub transcript: String,
    pub audio: Option<Bytes>,
    pub content_type: String,
    /// Whether the transcript came from the cache
    pub cached: bool,
}

/// Answer `request` in one piece.
///
/// A cached entry with audio is returned as-is. A cached transcript without
/// audio is synthesized without regenerating text, and the entry is upgraded.
/// Nothing is stored when any step fails.
pub async fn speak_once(
    context: &RelayContext,
    request: StreamRequest,
) -> Result<SpokenResponse, RelayError> {
    let span = info_span!("speak", request_id = %Uuid::new_v4());
    speak_inner(context, request).instrument(span).await
}

async fn speak_inner(
    context: &RelayContext,
    request: StreamRequest,
) -> Result<SpokenResponse, RelayError> {
    let request = request.validate()?;
    let voice_id = resolve(
        &context.catalog,
        Some(&request.locale),
        request.style.as_deref(),
        request.voice_override.as_deref(),
    )?;
    let key = request.cache_key(&voice_id);

    let (transcript, cached) = match context.cache.lookup(&key).await {
        Some(hit) if hit.has_audio() => {
            info!(voice_id = %voice_id, key = %key.short(), "Serving cached response");
            return Ok(SpokenResponse {
                voice_id,
                transcript: hit.transcript,
                audio: hit.audio,
                content_type: hit.content_type,
                cached: true,
            });
        }
        Some(hit) => {
            debug!(key = %key.short(), "Cached transcript without audio");
            (hit.transcript, true)
        }
        None => (generate_text(context, &request).await?, false),
    };

    let synthesized = context
        .backend
        .synthesize(&OneShotRequest {
            text: transcript.clone(),
            voice_id: voice_id.clone(),
            style: request.style.clone(),
            format: request.format,
        })
        .await
        .map_err(RelayError::UpstreamFailed)?;

    info!(voice_id = %voice_id, bytes = synthesized.audio.len(), cached, "One-shot synthesis completed");

    context
        .cache
        .store(
            &key,
            CacheEntry {
                transcript: transcript.clone(),
                audio: Some(synthesized.audio.clone()),
                content_type: synthesized.content_type.clone(),
            },
        )
        .await;

    Ok(SpokenResponse {
        voice_id,
        transcript,
        audio: Some(synthesized.audio),
        content_type: synthesized.content_type,
        cached,
    })
}
