//! Murf synthesis backend.
//!
//! Streaming uses the `speech/stream-input` WebSocket endpoint; the one-shot
//! path uses the `speech/generate` REST endpoint.
//!
//! # Streaming protocol
//!
//! ```text
//! client: {"voice_config": {"voiceId", "style", "rate", "pitch", "variation"}}
//! client: {"text": "...", "end": true}
//! server: {"audio": "<base64>"}            (zero or more)
//! server: {"final": true}                   (may also carry audio)
//! ```

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};
use url::Url;

use super::base::{
    BoxedSynthesisStream, OneShotRequest, StreamSettings, SynthesisBackend, SynthesisError,
    SynthesisResult, SynthesisStream, SynthesizedAudio, UpstreamEvent,
};
use super::messages::{
    GenerateRequest, GenerateResponse, ServerMessage, SpeechCustomization, TextMessage,
    VoiceConfigMessage,
};

/// Default streaming endpoint.
pub const MURF_STREAM_URL: &str = "wss://api.murf.ai/v1/speech/stream-input";

/// Default one-shot endpoint.
pub const MURF_GENERATE_URL: &str = "https://api.murf.ai/v1/speech/generate";

/// Murf backend settings.
#[derive(Debug, Clone)]
pub struct MurfConfig {
    pub api_key: Option<String>,
    pub stream_url: String,
    pub generate_url: String,
    /// Bound on the WebSocket handshake
    pub connect_timeout: Duration,
    /// Bound on each one-shot HTTP request
    pub request_timeout: Duration,
}

impl Default for MurfConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            stream_url: MURF_STREAM_URL.to_string(),
            generate_url: MURF_GENERATE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(45),
        }
    }
}

/// Murf implementation of [`SynthesisBackend`].
pub struct MurfBackend {
    config: MurfConfig,
    client: reqwest::Client,
}

impl MurfBackend {
    pub fn new(config: MurfConfig) -> SynthesisResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| {
                SynthesisError::ConnectionFailed(format!("Failed to create HTTP client: {e}"))
            })?;
        Ok(Self { config, client })
    }

    fn api_key(&self) -> SynthesisResult<&str> {
        self.config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(SynthesisError::MissingCredentials)
    }

    /// Streaming URL with the session's audio parameters.
    fn stream_url(&self, api_key: &str, settings: &StreamSettings) -> SynthesisResult<Url> {
        let mut url = Url::parse(&self.config.stream_url)
            .map_err(|e| SynthesisError::ConnectionFailed(format!("Invalid stream URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("api-key", api_key)
            .append_pair("sample_rate", &settings.sample_rate.to_string())
            .append_pair("channel_type", settings.channel.as_str())
            .append_pair("format", settings.format.as_str());
        Ok(url)
    }

    async fn fetch_audio_file(&self, audio_url: &str) -> SynthesisResult<Bytes> {
        let response = self
            .client
            .get(audio_url)
            .send()
            .await
            .map_err(|e| SynthesisError::ConnectionFailed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(SynthesisError::Http {
                status: response.status().as_u16(),
                body: String::new(),
            });
        }
        response
            .bytes()
            .await
            .map_err(|e| SynthesisError::Protocol(format!("Failed to read audio file: {e}")))
    }
}

#[async_trait]
impl SynthesisBackend for MurfBackend {
    async fn open_stream(&self, settings: &StreamSettings) -> SynthesisResult<BoxedSynthesisStream> {
        let api_key = self.api_key()?;
        let url = self.stream_url(api_key, settings)?;

        let connect = connect_async(url.as_str());
        let (ws, _response) = tokio::time::timeout(self.config.connect_timeout, connect)
            .await
            .map_err(|_| SynthesisError::ConnectTimeout(self.config.connect_timeout))?
            .map_err(|e| SynthesisError::ConnectionFailed(e.to_string()))?;

        info!(voice_id = %settings.voice_id, format = %settings.format, "Connected to synthesis stream");

        Ok(Box::new(MurfStream {
            ws: Some(ws),
            pending: VecDeque::new(),
            finished: false,
        }))
    }

    async fn synthesize(&self, request: &OneShotRequest) -> SynthesisResult<SynthesizedAudio> {
        let api_key = self.api_key()?;
        let format = request.format.as_str().to_ascii_lowercase();
        let body = GenerateRequest {
            text: &request.text,
            voice_id: &request.voice_id,
            format: &format,
            encode_as_base64: true,
            speech_customization: request
                .style
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .map(|style| SpeechCustomization { style }),
        };

        debug!(voice_id = %request.voice_id, format = %format, "Requesting one-shot synthesis");

        let response = self
            .client
            .post(&self.config.generate_url)
            .header("api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SynthesisError::ConnectionFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SynthesisError::Http {
                status: status.as_u16(),
                body: body.chars().take(400).collect(),
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| SynthesisError::Protocol(format!("Invalid response body: {e}")))?;

        let audio = match (parsed.encoded_audio, parsed.audio_file) {
            (Some(b64), _) if !b64.is_empty() => BASE64
                .decode(b64.as_bytes())
                .map(Bytes::from)
                .map_err(|e| SynthesisError::Protocol(format!("Invalid base64 audio: {e}")))?,
            (_, Some(url)) if !url.is_empty() => self.fetch_audio_file(&url).await?,
            _ => return Err(SynthesisError::NoAudio),
        };

        if audio.is_empty() {
            return Err(SynthesisError::NoAudio);
        }

        Ok(SynthesizedAudio {
            audio,
            content_type: request.format.content_type().to_string(),
        })
    }
}

// =============================================================================
// Stream
// =============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct MurfStream {
    ws: Option<WsStream>,
    /// Events decoded from one message but not yet returned
    pending: VecDeque<UpstreamEvent>,
    finished: bool,
}

impl MurfStream {
    async fn send_json<T: serde::Serialize>(&mut self, message: &T) -> SynthesisResult<()> {
        let ws = self
            .ws
            .as_mut()
            .ok_or_else(|| SynthesisError::WebSocket("stream is closed".to_string()))?;
        let json = serde_json::to_string(message)
            .map_err(|e| SynthesisError::Protocol(e.to_string()))?;
        ws.send(Message::Text(json.into()))
            .await
            .map_err(|e| SynthesisError::WebSocket(e.to_string()))
    }

    /// Decode one server message into queued events.
    fn decode(&mut self, text: &str) -> SynthesisResult<()> {
        let message: ServerMessage = serde_json::from_str(text)
            .map_err(|e| SynthesisError::Protocol(format!("Invalid server message: {e}")))?;

        if let Some(error) = message.error_message() {
            return Err(SynthesisError::Upstream(error));
        }

        if let Some(b64) = message.audio.as_deref()
            && !b64.is_empty()
        {
            let audio = BASE64
                .decode(b64.as_bytes())
                .map_err(|e| SynthesisError::Protocol(format!("Invalid base64 audio: {e}")))?;
            self.pending.push_back(UpstreamEvent::Audio(Bytes::from(audio)));
        }

        if message.is_final {
            self.pending.push_back(UpstreamEvent::Final);
        }
        Ok(())
    }

    fn fail(&mut self, error: SynthesisError) -> Option<SynthesisResult<UpstreamEvent>> {
        self.finished = true;
        self.pending.clear();
        Some(Err(error))
    }
}

#[async_trait]
impl SynthesisStream for MurfStream {
    async fn send_voice_config(&mut self, settings: &StreamSettings) -> SynthesisResult<()> {
        let message = VoiceConfigMessage::neutral(&settings.voice_id, settings.style_or_default());
        self.send_json(&message).await
    }

    async fn send_text(&mut self, text: &str, end: bool) -> SynthesisResult<()> {
        self.send_json(&TextMessage { text, end }).await
    }

    async fn next_event(&mut self) -> Option<SynthesisResult<UpstreamEvent>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                if event == UpstreamEvent::Final {
                    self.finished = true;
                    self.pending.clear();
                }
                return Some(Ok(event));
            }
            if self.finished {
                return None;
            }

            let Some(ws) = self.ws.as_mut() else {
                return self.fail(SynthesisError::Closed);
            };

            match ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    if let Err(e) = self.decode(text.as_str()) {
                        return self.fail(e);
                    }
                }
                Some(Ok(Message::Binary(data))) => {
                    self.pending.push_back(UpstreamEvent::Audio(data));
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "Synthesis stream closed by upstream");
                    return self.fail(SynthesisError::Closed);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return self.fail(SynthesisError::WebSocket(e.to_string())),
                None => return self.fail(SynthesisError::Closed),
            }
        }
    }

    async fn close(&mut self) {
        self.finished = true;
        if let Some(mut ws) = self.ws.take()
            && let Err(e) = ws.close(None).await
        {
            warn!(error = %e, "Failed to close synthesis stream cleanly");
        }
    }
}
