//! Streaming client for the `/ws/stream` endpoint.
//!
//! Yields the relay's frames in arrival order, ready to be fed to a
//! [`PlaybackConsumer`](crate::core::playback::PlaybackConsumer).
//!
//! # Example
//! ```rust,no_run
//! use vibe_gateway::client::StreamClient;
//! use vibe_gateway::core::playback::{PlaybackConsumer, WavFileFactory};
//! use vibe_gateway::core::relay::StreamRequest;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = StreamClient::new("http://127.0.0.1:3001")?;
//! let frames = client.stream(&StreamRequest::new("Explain this diff")).await?;
//!
//! let mut consumer = PlaybackConsumer::new(WavFileFactory::new("reply.wav"));
//! let outcome = consumer.consume(frames).await?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

use futures_util::{SinkExt, Stream, StreamExt};
use std::time::Duration;
use thiserror::Error;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;
use url::Url;

use crate::core::relay::{StreamFrame, StreamRequest};

/// Path of the streaming endpoint.
pub const STREAM_PATH: &str = "/ws/stream";

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid gateway URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to connect to gateway: {0}")]
    Connect(String),

    #[error("Connection to gateway timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Undecodable frame: {0}")]
    Decode(String),
}

/// Client for one gateway.
#[derive(Debug, Clone)]
pub struct StreamClient {
    url: Url,
    connect_timeout: Duration,
}

impl StreamClient {
    /// Accepts `ws`, `wss`, `http` or `https` URLs. A URL without a path
    /// points at the default streaming endpoint.
    pub fn new(gateway: &str) -> Result<Self, ClientError> {
        let mut url = Url::parse(gateway).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;

        let scheme = match url.scheme() {
            "ws" | "http" => "ws",
            "wss" | "https" => "wss",
            other => {
                return Err(ClientError::InvalidUrl(format!(
                    "unsupported scheme '{other}'"
                )));
            }
        };
        url.set_scheme(scheme)
            .map_err(|_| ClientError::InvalidUrl(format!("cannot use scheme '{scheme}'")))?;

        if url.path().is_empty() || url.path() == "/" {
            url.set_path(STREAM_PATH);
        }

        Ok(Self {
            url,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        })
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Send `request` and return the frames of the resulting session.
    ///
    /// The stream ends after the terminal frame or when the gateway closes
    /// the connection.
    pub async fn stream(
        &self,
        request: &StreamRequest,
    ) -> Result<impl Stream<Item = Result<StreamFrame, ClientError>> + Send + 'static, ClientError>
    {
        let (ws_stream, _) = tokio::time::timeout(self.connect_timeout, connect_async(self.url.as_str()))
            .await
            .map_err(|_| ClientError::ConnectTimeout(self.connect_timeout))?
            .map_err(|e| ClientError::Connect(e.to_string()))?;
        debug!(url = %self.url, "Connected to gateway");

        let (mut write, mut read) = ws_stream.split();

        let body =
            serde_json::to_string(request).map_err(|e| ClientError::Decode(e.to_string()))?;
        write
            .send(Message::Text(body.into()))
            .await
            .map_err(|e| ClientError::WebSocket(e.to_string()))?;

        Ok(async_stream::try_stream! {
            while let Some(msg) = read.next().await {
                let msg = msg.map_err(|e| ClientError::WebSocket(e.to_string()))?;
                let frame = match msg {
                    Message::Binary(data) => StreamFrame::Audio(data),
                    Message::Text(text) => serde_json::from_str::<StreamFrame>(text.as_str())
                        .map_err(|e| ClientError::Decode(e.to_string()))?,
                    Message::Close(_) => break,
                    _ => continue,
                };
                let terminal = frame.is_terminal();
                yield frame;
                if terminal {
                    break;
                }
            }
            let _ = write.close().await;
        })
    }
}
