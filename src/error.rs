//! Server error types with HTTP status code mapping.
//!
//! [`ServerError`] covers startup and runtime failures. The variants that
//! can surface while serving a request also map to an HTTP status and a
//! structured JSON body.

use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::broadcast::BroadcastError;
use crate::discovery::DiscoveryError;

/// Structured JSON error response body.
///
/// ```json
/// {
///   "error": {
///     "code": 2001,
///     "message": "server is shutting down"
///   }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
}

/// Server-side error enum.
///
/// # Error Code Ranges
///
/// | Range     | Category  | HTTP Status                 |
/// |-----------|-----------|-----------------------------|
/// | 1000–1999 | Startup   | 500 Internal Server Error   |
/// | 2000–2999 | Lifecycle | 503 Service Unavailable     |
/// | 3000–3999 | Runtime   | 500 Internal Server Error   |
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration could not be loaded.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The service could not be advertised.
    #[error("service discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    /// The listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: SocketAddr,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The server is shutting down and accepts no new sessions.
    #[error("server is shutting down")]
    ShuttingDown,

    /// The HTTP server loop failed.
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Config(_) => 1001,
            Self::Discovery(_) => 1002,
            Self::Bind { .. } => 1003,
            Self::ShuttingDown => 2001,
            Self::Serve(_) => 3001,
            Self::Internal(_) => 3000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            Self::Config(_)
            | Self::Discovery(_)
            | Self::Bind { .. }
            | Self::Serve(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<BroadcastError> for ServerError {
    fn from(err: BroadcastError) -> Self {
        match err {
            BroadcastError::Closed => Self::ShuttingDown,
            other @ BroadcastError::DuplicateConnection(_) => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
