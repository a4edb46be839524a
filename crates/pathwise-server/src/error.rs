use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use pathwise_engine::DiscoveryError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Too many requests")]
    TooManyRequests,

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DiscoveryError> for ServerError {
    fn from(err: DiscoveryError) -> Self {
        match err {
            DiscoveryError::Validation(msg) => ServerError::BadRequest(msg),
            DiscoveryError::NotFound(what) => ServerError::NotFound(what),
            e if e.is_retryable() => ServerError::Unavailable(e.to_string()),
            e => ServerError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ServerError::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()),
            ServerError::TooManyRequests => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
            ServerError::Unavailable(_) => {
                tracing::warn!(error = %self, "request failed on a transient error");
                (StatusCode::SERVICE_UNAVAILABLE, "Service temporarily unavailable".to_string())
            }
            ServerError::Internal(_) => {
                tracing::error!(error = %self, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}
