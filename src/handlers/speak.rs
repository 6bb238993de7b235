use axum::{extract::State, response::Json};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::relay::{StreamRequest, speak_once};
use crate::errors::AppResult;
use crate::state::AppState;

/// Body of a `/speak` answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakResponse {
    pub transcript: String,
    /// Base64 audio; null when none is available
    pub audio_b64: Option<String>,
    pub mime: String,
    pub voice_id: String,
    pub cached: bool,
}

/// Generate a reply and synthesize it in one request.
///
/// Takes the same JSON body as the streaming endpoint.
pub async fn speak_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StreamRequest>,
) -> AppResult<Json<SpeakResponse>> {
    let response = speak_once(&state.relay_context(), request).await?;

    Ok(Json(SpeakResponse {
        transcript: response.transcript,
        audio_b64: response.audio.map(|audio| BASE64.encode(audio)),
        mime: response.content_type,
        voice_id: response.voice_id,
        cached: response.cached,
    }))
}
