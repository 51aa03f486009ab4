use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use parley_core::errors::GenerateError;
use parley_engine::ChatError;

/// Errors surfaced to HTTP clients as `{"error": {"code", "message"}}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error("session not found: {0}")]
    SessionNotFound(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Chat(ChatError::Generate(e)) => match e {
                GenerateError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                GenerateError::ModelLoading { .. } => StatusCode::SERVICE_UNAVAILABLE,
                GenerateError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::Chat(ChatError::TooManySessions { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            Self::SessionNotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Chat(ChatError::Generate(e)) => match e {
                GenerateError::Timeout(_) => "GENERATION_TIMEOUT",
                GenerateError::ModelLoading { .. } => "MODEL_LOADING",
                GenerateError::RateLimited { .. } => "RATE_LIMITED",
                _ => "GENERATION_FAILED",
            },
            Self::Chat(ChatError::TooManySessions { .. }) => "TOO_MANY_SESSIONS",
            Self::SessionNotFound(_) => "SESSION_NOT_FOUND",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), code = self.code(), error = %self, "request failed");
        }
        let body = json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}
