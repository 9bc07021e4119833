//! Error types for HTTP handlers.
//!
//! Bridges [`WaitingRoomError`] to HTTP responses. Every error body is
//! `{"code": ..., "message": ...}` where `code` is the stable client-facing
//! error kind.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;
use waiting_room_core::WaitingRoomError;

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: &'static str,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: &'static str) -> Self {
        Self {
            status,
            message,
            code,
            source: None,
        }
    }

    /// Attach the underlying cause.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message.into(), "BAD_REQUEST")
    }

    /// HTTP status of this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Client-facing error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<WaitingRoomError> for AppError {
    fn from(err: WaitingRoomError) -> Self {
        let status = match &err {
            WaitingRoomError::NotInQueue | WaitingRoomError::SeatNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            WaitingRoomError::NoToken => StatusCode::FORBIDDEN,
            WaitingRoomError::SeatContended | WaitingRoomError::AlreadyReserved(_) => {
                StatusCode::CONFLICT
            }
            WaitingRoomError::Cache(_) | WaitingRoomError::Store(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        };

        if err.is_infrastructure() {
            // Infrastructure detail stays in the logs
            Self::new(status, "A dependency is unavailable".to_string(), err.code())
                .with_source(anyhow::Error::new(err))
        } else {
            Self::new(status, err.to_string(), err.code())
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Error code (for client error handling).
    code: &'static str,
    /// Human-readable error message.
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    error = %source,
                    "Request failed on a dependency"
                );
            } else {
                tracing::error!(status = %self.status, code = %self.code, "Request failed");
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };

        (self.status, Json(body)).into_response()
    }
}
