//! Streaming WebSocket handler
//!
//! The client sends one JSON request as a text message. The gateway answers
//! with JSON control frames (`info`, `cached`, `final`, `error`) as text
//! messages and audio payloads as binary messages, then closes the socket
//! after the terminal frame.
//!
//! A client that disconnects mid-session cancels the relay, which closes the
//! upstream stream and persists nothing.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::core::relay::{
    FRAME_CHANNEL_CAPACITY, RelayError, RelayOutcome, RelaySession, StreamFrame, StreamRequest,
};
use crate::state::AppState;

/// Maximum WebSocket message size (1 MB); requests are small JSON documents
const MAX_WS_MESSAGE_SIZE: usize = 1024 * 1024;

/// How long a fresh connection may wait before sending its request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

type WsSender = SplitSink<WebSocket, Message>;
type WsReceiver = SplitStream<WebSocket>;

/// Streaming WebSocket handler
///
/// Upgrades the HTTP connection to a WebSocket carrying one relay session.
pub async fn ws_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    debug!("Stream WebSocket connection upgrade requested");

    ws.max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_stream_socket(socket, state))
}

async fn handle_stream_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let request = match tokio::time::timeout(REQUEST_TIMEOUT, read_request(&mut receiver)).await
    {
        Ok(Ok(Some(request))) => request,
        Ok(Ok(None)) => {
            info!("Stream WebSocket closed before a request was sent");
            return;
        }
        Ok(Err(e)) => {
            warn!(error = %e, "Rejecting stream request");
            let _ = send_frame(&mut sender, e.to_frame()).await;
            let _ = sender.send(Message::Close(None)).await;
            return;
        }
        Err(_) => {
            warn!("No stream request received within {:?}", REQUEST_TIMEOUT);
            let frame = RelayError::MalformedRequest("no request received".to_string()).to_frame();
            let _ = send_frame(&mut sender, frame).await;
            let _ = sender.send(Message::Close(None)).await;
            return;
        }
    };

    let (frame_tx, mut frame_rx) = mpsc::channel::<StreamFrame>(FRAME_CHANNEL_CAPACITY);
    let cancel = CancellationToken::new();
    let session = RelaySession::new(state.relay_context());
    let session_id = session.id();
    info!(session_id = %session_id, "Stream session started");

    let relay_task = tokio::spawn(session.run(request, frame_tx, cancel.clone()));

    loop {
        tokio::select! {
            frame = frame_rx.recv() => {
                let Some(frame) = frame else { break };
                let terminal = frame.is_terminal();
                if let Err(e) = send_frame(&mut sender, frame).await {
                    warn!(session_id = %session_id, "Failed to send frame, cancelling session: {}", e);
                    cancel.cancel();
                    break;
                }
                if terminal {
                    break;
                }
            }
            msg = receiver.next() => match msg {
                Some(Ok(Message::Close(_))) | None => {
                    info!(session_id = %session_id, "Client closed stream mid-session");
                    cancel.cancel();
                    break;
                }
                Some(Err(e)) => {
                    warn!(session_id = %session_id, "Stream WebSocket error: {}", e);
                    cancel.cancel();
                    break;
                }
                Some(Ok(_)) => {
                    debug!(session_id = %session_id, "Ignoring client message during session");
                }
            }
        }
    }

    match relay_task.await {
        Ok(RelayOutcome::Completed { voice_id, audio_frames }) => {
            debug!(session_id = %session_id, voice_id = %voice_id, audio_frames, "Stream session finished");
        }
        Ok(RelayOutcome::CacheHit { voice_id }) => {
            debug!(session_id = %session_id, voice_id = %voice_id, "Stream session served from cache");
        }
        Ok(RelayOutcome::Failed(e)) => {
            debug!(session_id = %session_id, code = e.code(), "Stream session failed");
        }
        Ok(RelayOutcome::Cancelled) => {
            debug!(session_id = %session_id, "Stream session cancelled");
        }
        Err(e) => {
            error!(session_id = %session_id, "Relay task panicked: {}", e);
        }
    }

    let _ = sender.send(Message::Close(None)).await;
    info!(session_id = %session_id, "Stream WebSocket connection terminated");
}

/// Wait for the request message; `Ok(None)` when the client left first.
async fn read_request(receiver: &mut WsReceiver) -> Result<Option<StreamRequest>, RelayError> {
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                debug!("Received stream request: {} bytes", text.len());
                return serde_json::from_str::<StreamRequest>(text.as_str())
                    .map(Some)
                    .map_err(|e| RelayError::MalformedRequest(format!("invalid request: {e}")));
            }
            Ok(Message::Binary(_)) => {
                return Err(RelayError::MalformedRequest(
                    "expected a JSON text message".to_string(),
                ));
            }
            Ok(Message::Close(_)) => return Ok(None),
            Ok(_) => continue,
            Err(e) => {
                debug!("WebSocket error before request: {}", e);
                return Ok(None);
            }
        }
    }
    Ok(None)
}

/// Write one frame: audio as binary, everything else as JSON text.
async fn send_frame(sender: &mut WsSender, frame: StreamFrame) -> Result<(), axum::Error> {
    let message = match frame {
        StreamFrame::Audio(chunk) => Message::Binary(chunk),
        other => match other.to_json() {
            Some(json) => Message::Text(json.into()),
            None => {
                error!("Failed to serialize {} frame", other.kind());
                return Ok(());
            }
        },
    };
    sender.send(message).await
}
