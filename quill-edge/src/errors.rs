//! Edge error types and their HTTP projection.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures an HTTP handler can hit before or while waiting on the Core.
/// Everything renders as `{ "error": ... }` with the matching status.
#[derive(Debug, Error)]
pub enum EdgeError {
    /// Request rejected before any Core traffic (malformed JSON, bad field).
    #[error("{0}")]
    BadRequest(String),

    /// The correlator deadline expired.
    #[error("gateway timeout")]
    Timeout,

    /// Writing the task onto the request channel failed.
    #[error("ipc send failed")]
    SendFailed,

    /// The Core connection is gone; the Edge is refusing new work.
    #[error("core unavailable")]
    Unavailable,
}

impl EdgeError {
    pub fn status(&self) -> StatusCode {
        match self {
            EdgeError::BadRequest(_) => StatusCode::BAD_REQUEST,
            EdgeError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            EdgeError::SendFailed => StatusCode::INTERNAL_SERVER_ERROR,
            EdgeError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        EdgeError::BadRequest(message.into())
    }
}

impl IntoResponse for EdgeError {
    fn into_response(self) -> Response {
        let body = json!({ "error": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}
