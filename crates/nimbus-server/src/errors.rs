//! Server error types.

use axum::Json;
use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Failures of a transport's send or delivery path.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The underlying medium is gone.
    #[error("transport closed")]
    Closed,

    /// An inbound message arrived before any handler was registered.
    #[error("No message handler registered")]
    HandlerNotReady,

    /// A response could not be encoded.
    #[error("failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failures registering a session.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A live session already uses this id.
    #[error("session {0} is already registered")]
    DuplicateSession(String),

    /// The id belonged to a session that has since been removed.
    #[error("session {0} was removed and cannot be reused")]
    SessionRetired(String),
}

/// HTTP-facing error rendered as `{"error": message}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 400.
    #[error("{0}")]
    BadRequest(String),
    /// 401.
    #[error("{0}")]
    Unauthorized(String),
    /// 404.
    #[error("{0}")]
    NotFound(String),
    /// 413.
    #[error("{0}")]
    PayloadTooLarge(String),
    /// 500.
    #[error("{0}")]
    Internal(String),
}

/// Message for a missing or retired session.
pub const SESSION_NOT_FOUND: &str = "Session not found";

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The standard "session not found" error.
    pub fn session_not_found() -> Self {
        Self::NotFound(SESSION_NOT_FOUND.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Closed => Self::session_not_found(),
            TransportError::HandlerNotReady | TransportError::Serialize(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        let message = rejection.body_text();
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(message)
        } else {
            Self::BadRequest(message)
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        Self::Internal(err.to_string())
    }
}
