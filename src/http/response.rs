//! Error responses.
//!
//! # Responsibilities
//! - Map proxy errors to HTTP status codes
//! - Render errors as a JSON body
//!
//! # Status Mapping
//! ```text
//! Transport / Exhaustion        → 502 Bad Gateway
//! Circuit open / No instances   → 503 Service Unavailable
//! Deadline exceeded             → 504 Gateway Timeout
//! Invalid instance              → 500 Internal Server Error
//! ```
//!
//! # Design Decisions
//! - Exhaustion whose last attempt hit an open circuit reports 503: every
//!   instance tried was shedding load

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::proxy::error::{ErrorKind, ProxyError};

/// JSON body of an error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: &'static str,
}

/// HTTP status for a proxy error.
pub fn status_for(error: &ProxyError) -> StatusCode {
    match error {
        ProxyError::CircuitOpen { .. } | ProxyError::NoInstances => StatusCode::SERVICE_UNAVAILABLE,
        ProxyError::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        ProxyError::InvalidInstance { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        ProxyError::Exhausted { .. } => match error.last_attempt() {
            ProxyError::CircuitOpen { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_GATEWAY,
        },
        ProxyError::Transport { .. }
        | ProxyError::Timeout { .. }
        | ProxyError::UpstreamStatus { .. }
        | ProxyError::Codec(_) => StatusCode::BAD_GATEWAY,
    }
}

fn kind_name(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Configuration => "configuration",
        ErrorKind::Admission => "admission",
        ErrorKind::Transport => "transport",
        ErrorKind::Exhaustion => "exhaustion",
        ErrorKind::NoInstances => "no_instances",
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if status.is_server_error() {
            tracing::warn!(status = %status, error = %self, "Request failed");
        }

        let body = ErrorBody {
            error: self.to_string(),
            kind: kind_name(self.kind()),
        };
        (status, Json(body)).into_response()
    }
}
