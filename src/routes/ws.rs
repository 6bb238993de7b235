use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::ws_stream_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the WebSocket router
pub fn create_ws_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ws/stream", get(ws_stream_handler))
        .layer(TraceLayer::new_for_http())
}
