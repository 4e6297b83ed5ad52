//! Auth routes.

use axum::{body::Bytes, extract::State, response::Response};
use serde::Deserialize;
use serde_json::json;

use quill_ipc::TaskKind;

use crate::app::EdgeState;
use crate::errors::EdgeError;
use crate::handlers::{parse_json, relay};

#[derive(Debug, Deserialize)]
struct CredentialsRequest {
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct LogoutRequest {
    token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    refresh_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordRequest {
    username: String,
    current_password: String,
    new_password: String,
}

pub async fn register(
    State(state): State<EdgeState>,
    body: Bytes,
) -> Result<Response, EdgeError> {
    let request: CredentialsRequest = parse_json(&body)?;
    relay(
        &state,
        TaskKind::Register,
        json!({
            "username": request.username,
            "password": request.password,
        }),
    )
    .await
}

pub async fn login(State(state): State<EdgeState>, body: Bytes) -> Result<Response, EdgeError> {
    let request: CredentialsRequest = parse_json(&body)?;
    relay(
        &state,
        TaskKind::SignIn,
        json!({
            "username": request.username,
            "password": request.password,
        }),
    )
    .await
}

pub async fn logout(State(state): State<EdgeState>, body: Bytes) -> Result<Response, EdgeError> {
    let request: LogoutRequest = parse_json(&body)?;
    relay(&state, TaskKind::LogOut, json!({ "token": request.token })).await
}

pub async fn refresh_token(
    State(state): State<EdgeState>,
    body: Bytes,
) -> Result<Response, EdgeError> {
    let request: RefreshRequest = parse_json(&body)?;
    relay(
        &state,
        TaskKind::AuthRefresh,
        json!({ "refreshToken": request.refresh_token }),
    )
    .await
}

pub async fn change_password(
    State(state): State<EdgeState>,
    body: Bytes,
) -> Result<Response, EdgeError> {
    let request: ChangePasswordRequest = parse_json(&body)?;
    relay(
        &state,
        TaskKind::AuthChangePassword,
        json!({
            "username": request.username,
            "currentPassword": request.current_password,
            "newPassword": request.new_password,
        }),
    )
    .await
}
