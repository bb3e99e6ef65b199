//! Error types for the HTTP/`WebSocket` adapter.
//!
//! [`ApiError`] wraps engine failures and request-shape problems and turns
//! them into a JSON body of the form `{"error": ..., "status": ...}` via
//! its [`IntoResponse`] implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use coinrelay_core::{ErrorKind, RelayError};

/// Errors returned by API handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The engine rejected the operation.
    #[error(transparent)]
    Relay(#[from] RelayError),

    /// A path segment was not a valid id.
    #[error("invalid id: {0}")]
    InvalidId(String),

    /// The request body could not be decoded.
    #[error("invalid request body: {0}")]
    InvalidBody(String),
}

impl ApiError {
    /// HTTP status code for this error.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Relay(err) => match err.kind() {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::InvalidState => StatusCode::CONFLICT,
                ErrorKind::NotOwned => StatusCode::FORBIDDEN,
            },
            Self::InvalidId(_) | Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
