use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::core::relay::RelayError;
use crate::core::voice::VoiceError;

/// Errors returned by HTTP handlers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    NoVoice(#[from] VoiceError),

    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Timeout(String),

    #[error("{0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NoVoice(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RelayError> for AppError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::MalformedRequest(_) => Self::BadRequest(err.to_string()),
            RelayError::NoVoice(e) => Self::NoVoice(e),
            RelayError::GenerationTimeout(_) => Self::Timeout(err.to_string()),
            RelayError::GenerationFailed(_)
            | RelayError::UpstreamUnavailable(_)
            | RelayError::UpstreamFailed(_) => Self::Upstream(err.to_string()),
            RelayError::ClientDisconnected => Self::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "Request failed");
        } else {
            tracing::debug!(status = %status, error = %self, "Request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::generator::GenerationError;
    use std::time::Duration;

    #[test]
    fn test_relay_error_mapping() {
        let cases = [
            (
                RelayError::MalformedRequest("text is required".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                RelayError::NoVoice(VoiceError::NoVoiceForLocale("xx-YY".into())),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                RelayError::GenerationFailed(GenerationError::EmptyOutput),
                StatusCode::BAD_GATEWAY,
            ),
            (
                RelayError::GenerationTimeout(Duration::from_secs(1)),
                StatusCode::GATEWAY_TIMEOUT,
            ),
        ];
        for (relay, status) in cases {
            assert_eq!(AppError::from(relay).status_code(), status);
        }
    }

    #[tokio::test]
    async fn test_into_response_body() {
        let response =
            AppError::NoVoice(VoiceError::NoVoiceForLocale("xx-YY".into())).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(value["error"].as_str().unwrap().contains("xx-YY"));
    }
}
