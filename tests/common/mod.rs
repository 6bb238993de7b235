//! Shared fixtures for gateway integration tests.
//!
//! - A mock synthesis WebSocket server speaking the Murf streaming protocol
//! - A wiremock Gemini `generateContent` endpoint
//! - A gateway served on a random local port

#![allow(dead_code)]

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use wiremock::matchers::{header, method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vibe_gateway::ServerConfig;
use vibe_gateway::core::relay::StreamRequest;
use vibe_gateway::routes::create_app;
use vibe_gateway::state::AppState;

pub const CATALOG: &str = r#"{
    "en-US": [
        {"id": "en-US-natalie", "name": "Natalie", "styles": ["Promo", "Conversational"]},
        {"id": "en-US-ken", "name": "Ken", "styles": ["Calm"]}
    ],
    "es-ES": [
        {"id": "es-ES-elvira", "styles": ["Conversational"]}
    ],
    "multi-locale": [
        {"id": "multi-ava", "locales": ["fr-FR", "de-DE"]}
    ]
}"#;

/// First audio chunk: 44-byte container header followed by PCM.
pub fn header_chunk() -> Vec<u8> {
    let mut chunk = b"RIFF".to_vec();
    chunk.resize(44, 0);
    chunk.extend(std::iter::repeat_n(1u8, 100));
    chunk
}

pub fn pcm_chunk() -> Vec<u8> {
    vec![2u8; 100]
}

// =============================================================================
// Mock synthesis server
// =============================================================================

/// What the mock upstream does after receiving the text message.
#[derive(Debug, Clone)]
pub enum UpstreamScript {
    /// Send every chunk, then the completion marker
    Audio(Vec<Vec<u8>>),
    /// Send the chunks, then an error message instead of completion
    FailAfter(Vec<Vec<u8>>),
    /// Send the chunks and never complete
    Hold(Vec<Vec<u8>>),
}

pub struct MockSynthesisServer {
    pub url: String,
    pub connections: Arc<AtomicUsize>,
    /// Connections the gateway has since closed or dropped
    pub closed: Arc<AtomicUsize>,
    /// Every JSON message received from the gateway, in order
    pub received: Arc<Mutex<Vec<Value>>>,
}

impl MockSynthesisServer {
    pub async fn start(script: UpstreamScript) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicUsize::new(0));
        let received = Arc::new(Mutex::new(Vec::new()));

        let conn_count = connections.clone();
        let closed_count = closed.clone();
        let log = received.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                conn_count.fetch_add(1, Ordering::SeqCst);
                let script = script.clone();
                let log = log.clone();
                let closed_count = closed_count.clone();
                tokio::spawn(async move {
                    handle_upstream(stream, script, log).await;
                    closed_count.fetch_add(1, Ordering::SeqCst);
                });
            }
        });

        Self {
            url: format!("ws://{addr}/v1/speech/stream-input"),
            connections,
            closed,
            received,
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Wait until `count` upstream connections have been closed by the gateway.
    pub async fn wait_for_closed(&self, count: usize) -> bool {
        for _ in 0..200 {
            if self.closed.load(Ordering::SeqCst) >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

async fn handle_upstream(stream: TcpStream, script: UpstreamScript, log: Arc<Mutex<Vec<Value>>>) {
    let Ok(mut ws) = accept_async(stream).await else {
        return;
    };

    // voice_config, then text
    let mut got_text = false;
    while !got_text {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => {
                let value: Value = serde_json::from_str(text.as_str()).unwrap_or(Value::Null);
                got_text = value.get("text").is_some();
                log.lock().unwrap().push(value);
            }
            Some(Ok(_)) => {}
            _ => return,
        }
    }

    let (chunks, last) = match script {
        UpstreamScript::Audio(chunks) => (chunks, Some(json!({ "final": true }))),
        UpstreamScript::FailAfter(chunks) => {
            (chunks, Some(json!({ "error": "voice quota exceeded" })))
        }
        UpstreamScript::Hold(chunks) => (chunks, None),
    };
    for chunk in chunks {
        let msg = json!({ "audio": BASE64.encode(&chunk) });
        if ws.send(Message::Text(msg.to_string().into())).await.is_err() {
            return;
        }
    }
    if let Some(last) = last {
        let _ = ws.send(Message::Text(last.to_string().into())).await;
    }

    // Drain until the gateway closes.
    while let Some(Ok(_)) = ws.next().await {}
}

// =============================================================================
// Mock generator
// =============================================================================

/// Gemini endpoint answering every call with `reply`.
pub async fn start_mock_generator(reply: &str, expected_calls: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/v1beta/models/.+:generateContent$"))
        .and(header("x-goog-api-key", "test-gemini-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": reply }] } }]
        })))
        .expect(expected_calls)
        .mount(&server)
        .await;
    server
}

// =============================================================================
// Gateway
// =============================================================================

pub fn test_config(synthesis_url: &str, generator_url: &str) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.host = "127.0.0.1".to_string();
    config.murf_api_key = Some("test-murf-key".to_string());
    config.gemini_api_key = Some("test-gemini-key".to_string());
    config.murf_stream_url = synthesis_url.to_string();
    config.gemini_base_url = generator_url.to_string();
    config.voice_catalog_inline = Some(CATALOG.to_string());
    config.generation_timeout_seconds = 5;
    config.upstream_connect_timeout_seconds = 5;
    config.rate_limit_requests_per_second = 100_000;
    config
}

pub struct TestGateway {
    pub addr: SocketAddr,
    pub state: Arc<AppState>,
}

impl TestGateway {
    pub async fn spawn(config: ServerConfig) -> Self {
        let state = AppState::new(config).await.unwrap();
        let app = create_app(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        Self { addr, state }
    }

    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws/stream", self.addr)
    }

    /// Whether an answer to `text` with `voice_id` is cached right now.
    pub async fn is_cached(&self, text: &str, voice_id: &str) -> bool {
        let key = StreamRequest::new(text)
            .validate()
            .unwrap()
            .cache_key(voice_id);
        self.state.relay_context().cache.lookup(&key).await.is_some()
    }

    /// Wait until the streamed answer to `text` with `voice_id` is cached.
    pub async fn wait_for_cache(&self, text: &str, voice_id: &str) {
        let key = StreamRequest::new(text)
            .validate()
            .unwrap()
            .cache_key(voice_id);
        let cache = self.state.relay_context().cache;
        for _ in 0..100 {
            if cache.lookup(&key).await.is_some() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("response for {text:?} was never cached");
    }
}
