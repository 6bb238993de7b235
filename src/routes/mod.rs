//! Router assembly.

pub mod api;
pub mod ws;

use axum::{Router, routing::get};
use http::{Method, header::CONTENT_TYPE};
use std::sync::Arc;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::handlers;
use crate::state::AppState;

/// Rates at or above this disable rate limiting entirely.
const RATE_LIMIT_DISABLED_AT: u32 = 100_000;

/// Build the complete application: public, API and WebSocket routes with
/// CORS, rate limiting and security headers.
///
/// Serve it with `into_make_service_with_connect_info::<SocketAddr>()` so the
/// rate limiter can key on the peer address.
pub fn create_app(state: Arc<AppState>) -> Router {
    let cors_layer = cors_layer(&state.config);

    let rps = state.config.rate_limit_requests_per_second;
    let governor_layer = if rps < RATE_LIMIT_DISABLED_AT {
        // One token is replenished every period.
        let period_ms = (1000 / u64::from(rps.max(1))).max(1);
        let governor_config = GovernorConfigBuilder::default()
            .per_millisecond(period_ms)
            .burst_size(state.config.rate_limit_burst_size)
            .key_extractor(SmartIpKeyExtractor)
            .finish();
        if governor_config.is_none() {
            warn!("Invalid rate limit settings, rate limiting disabled");
        }
        governor_config.map(GovernorLayer::new)
    } else {
        info!("Rate limiting disabled (rate >= {RATE_LIMIT_DISABLED_AT}/s)");
        None
    };

    let security_headers = tower::ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            http::header::X_CONTENT_TYPE_OPTIONS,
            http::HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            http::header::X_FRAME_OPTIONS,
            http::HeaderValue::from_static("DENY"),
        ));

    let public_routes = Router::new().route("/", get(handlers::api::health_check));

    public_routes
        .merge(api::create_api_router())
        .merge(ws::create_ws_router())
        .with_state(state)
        .layer(cors_layer)
        .layer(tower::util::option_layer(governor_layer))
        .layer(security_headers)
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    match config.cors_allowed_origins.as_deref() {
        Some("*") => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([CONTENT_TYPE])
            .allow_credentials(false),
        Some(origins) => {
            let origins: Vec<_> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([CONTENT_TYPE])
        }
        None => {
            info!(
                "CORS not configured, defaulting to same-origin only. \
                 Set CORS_ALLOWED_ORIGINS to enable cross-origin access."
            );
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([CONTENT_TYPE])
        }
    }
}
