//! HTTP handlers.
//!
//! Each handler parses its route's inputs, builds the task payload, and
//! relays through the correlator. Body parsing happens before any Core
//! traffic, so malformed JSON is a local 400. Reply mapping: a reply of the
//! originating kind takes its HTTP status from `payload.statusCode`
//! (default 200) with the rest of the payload as the body; an ERROR reply
//! takes its status from `payload.statusCode` (default 500) with
//! `{ "error": ... }` as the body.

pub mod auth;
pub mod classes;
pub mod notes;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value as JsonValue};

use quill_ipc::{TaskKind, TaskRecord};

use crate::app::EdgeState;
use crate::errors::EdgeError;

/// Edge-local liveness: never touches the Core.
pub async fn ping() -> &'static str {
    "Pong!\n"
}

/// Liveness through the whole pipeline.
pub async fn ping_core(State(state): State<EdgeState>) -> Result<Response, EdgeError> {
    relay(&state, TaskKind::Ping, json!({})).await
}

/// Send one task and project its reply onto HTTP.
pub(crate) async fn relay(
    state: &EdgeState,
    kind: TaskKind,
    payload: JsonValue,
) -> Result<Response, EdgeError> {
    let reply = state.correlator.call(kind, payload).await?;
    Ok(reply_to_response(reply))
}

fn reply_to_response(reply: TaskRecord) -> Response {
    if reply.kind == TaskKind::Error {
        let status = status_from(&reply.payload, StatusCode::INTERNAL_SERVER_ERROR);
        let message = reply.payload["error"].as_str().unwrap_or("internal error");
        return (status, Json(json!({ "error": message }))).into_response();
    }

    let mut payload = reply.payload;
    let status = status_from(&payload, StatusCode::OK);
    if let Some(body) = payload.as_object_mut() {
        body.remove("statusCode");
    }
    (status, Json(payload)).into_response()
}

fn status_from(payload: &JsonValue, default: StatusCode) -> StatusCode {
    payload
        .get("statusCode")
        .and_then(JsonValue::as_u64)
        .and_then(|code| StatusCode::from_u16(code as u16).ok())
        .unwrap_or(default)
}

/// Parse a request body, mapping failure to a local 400.
pub(crate) fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, EdgeError> {
    serde_json::from_slice(body)
        .map_err(|e| EdgeError::bad_request(format!("invalid request body: {}", e)))
}

/// Pull the token out of `Authorization: Bearer <token>`.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
}

/// Insert the bearer token into a task payload, when present. Whether a
/// token is required is the Core's call.
pub(crate) fn with_token(mut payload: JsonValue, token: Option<String>) -> JsonValue {
    if let (Some(body), Some(token)) = (payload.as_object_mut(), token) {
        body.insert("token".to_string(), json!(token));
    }
    payload
}
