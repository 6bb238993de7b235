//! HTTP and WebSocket request handlers
//!
//! - `api` - Health check endpoint
//! - `speak` - Non-streaming generate-and-synthesize endpoint
//! - `stream` - WebSocket relay of streamed speech
//! - `voices` - Voice catalog listing and resolution

pub mod api;
pub mod speak;
pub mod stream;
pub mod voices;

pub use stream::ws_stream_handler;
