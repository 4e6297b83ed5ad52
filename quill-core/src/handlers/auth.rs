//! Auth handlers: register, sign-in, logout, token refresh, password change.

use bcrypt::{hash, verify, DEFAULT_COST};
use serde_json::{json, Value as JsonValue};
use tracing::{info, warn};

use crate::error::HandlerError;
use crate::handlers::{require_str, HandlerContext};

pub async fn register(
    payload: &JsonValue,
    ctx: &HandlerContext,
) -> Result<JsonValue, HandlerError> {
    let username = require_str(payload, "username")?;
    let password = require_str(payload, "password")?;

    if username.len() < 3 {
        return Err(HandlerError::bad_request(
            "username must be at least 3 characters",
        ));
    }
    if password.len() < 6 {
        return Err(HandlerError::bad_request(
            "password must be at least 6 characters",
        ));
    }

    if ctx.storage.get_user_by_name(username).await?.is_some() {
        return Err(HandlerError::Conflict(format!(
            "user {} already exists",
            username
        )));
    }

    let password_hash = hash(password, DEFAULT_COST)?;
    let user = ctx.storage.create_user(username, &password_hash).await?;
    info!(username, user_id = user.id, "user registered");

    Ok(json!({
        "message": "user registered",
        "userId": user.id,
    }))
}

pub async fn sign_in(
    payload: &JsonValue,
    ctx: &HandlerContext,
) -> Result<JsonValue, HandlerError> {
    let username = require_str(payload, "username")?;
    let password = require_str(payload, "password")?;

    let user = ctx
        .storage
        .get_user_by_name(username)
        .await?
        .ok_or_else(|| HandlerError::unauthorized("invalid username or password"))?;

    if !verify(password, &user.password_hash)? {
        warn!(username, "sign-in rejected, bad password");
        return Err(HandlerError::unauthorized("invalid username or password"));
    }

    let (token, session_id) = ctx.sessions.issue(user.id).await;
    info!(username, user_id = user.id, "signed in");

    Ok(json!({
        "token": token,
        "sessionId": session_id,
    }))
}

/// Logout is idempotent: an unknown token still answers 200.
pub async fn log_out(
    payload: &JsonValue,
    ctx: &HandlerContext,
) -> Result<JsonValue, HandlerError> {
    let token = require_str(payload, "token")?;

    if ctx.invalidate_sessions_on_logout {
        ctx.sessions.revoke(token).await;
    }

    Ok(json!({ "message": "logged out" }))
}

pub async fn refresh(
    payload: &JsonValue,
    ctx: &HandlerContext,
) -> Result<JsonValue, HandlerError> {
    let token = require_str(payload, "refreshToken")?;

    let new_token = ctx
        .sessions
        .refresh(token)
        .await
        .ok_or_else(|| HandlerError::unauthorized("invalid token"))?;

    Ok(json!({ "token": new_token }))
}

pub async fn change_password(
    payload: &JsonValue,
    ctx: &HandlerContext,
) -> Result<JsonValue, HandlerError> {
    let username = require_str(payload, "username")?;
    let current = require_str(payload, "currentPassword")?;
    let new_password = require_str(payload, "newPassword")?;

    if new_password.len() < 6 {
        return Err(HandlerError::bad_request(
            "password must be at least 6 characters",
        ));
    }

    let user = ctx
        .storage
        .get_user_by_name(username)
        .await?
        .ok_or_else(|| HandlerError::NotFound(format!("user {} not found", username)))?;

    if !verify(current, &user.password_hash)? {
        return Err(HandlerError::Forbidden(
            "current password is incorrect".to_string(),
        ));
    }

    let password_hash = hash(new_password, DEFAULT_COST)?;
    ctx.storage.update_password(username, &password_hash).await?;

    // Old credentials must stop working everywhere.
    ctx.sessions.revoke_user(user.id).await;
    info!(username, "password changed");

    Ok(json!({ "message": "password changed" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testutil;

    #[tokio::test]
    async fn register_then_sign_in() {
        let (_dir, ctx) = testutil::context().await;

        let body = register(
            &json!({ "username": "alice", "password": "secret123" }),
            &ctx,
        )
        .await
        .unwrap();
        assert_eq!(body["message"], "user registered");
        assert!(body["userId"].as_u64().unwrap() >= 1);

        let body = sign_in(
            &json!({ "username": "alice", "password": "secret123" }),
            &ctx,
        )
        .await
        .unwrap();
        assert!(!body["token"].as_str().unwrap().is_empty());
        assert!(!body["sessionId"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn wrong_password_is_401() {
        let (_dir, ctx) = testutil::context().await;
        register(&json!({ "username": "alice", "password": "secret123" }), &ctx)
            .await
            .unwrap();

        let err = sign_in(&json!({ "username": "alice", "password": "wrong" }), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 401);
    }

    #[tokio::test]
    async fn unknown_user_and_bad_password_are_indistinguishable() {
        let (_dir, ctx) = testutil::context().await;
        register(&json!({ "username": "alice", "password": "secret123" }), &ctx)
            .await
            .unwrap();

        let unknown = sign_in(&json!({ "username": "nobody", "password": "x" }), &ctx)
            .await
            .unwrap_err();
        let bad = sign_in(&json!({ "username": "alice", "password": "x" }), &ctx)
            .await
            .unwrap_err();
        assert_eq!(unknown.to_string(), bad.to_string());
    }

    #[tokio::test]
    async fn duplicate_registration_is_409() {
        let (_dir, ctx) = testutil::context().await;
        register(&json!({ "username": "alice", "password": "secret123" }), &ctx)
            .await
            .unwrap();
        let err = register(&json!({ "username": "alice", "password": "other1" }), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 409);
    }

    #[tokio::test]
    async fn weak_credentials_are_400() {
        let (_dir, ctx) = testutil::context().await;
        let short_name = register(&json!({ "username": "al", "password": "secret123" }), &ctx)
            .await
            .unwrap_err();
        assert_eq!(short_name.status_code(), 400);

        let short_pass = register(&json!({ "username": "alice", "password": "abc" }), &ctx)
            .await
            .unwrap_err();
        assert_eq!(short_pass.status_code(), 400);
    }

    #[tokio::test]
    async fn logout_invalidates_when_configured() {
        let (_dir, ctx) = testutil::context().await;
        let (_user_id, token) = testutil::signed_in_user(&ctx, "alice").await;

        log_out(&json!({ "token": token }), &ctx).await.unwrap();
        assert!(ctx.sessions.lookup(&token).await.is_none());

        // Logging out twice still answers cleanly.
        log_out(&json!({ "token": token }), &ctx).await.unwrap();
    }

    #[tokio::test]
    async fn logout_keeps_session_when_flag_is_off() {
        let (_dir, mut ctx) = testutil::context().await;
        ctx.invalidate_sessions_on_logout = false;
        let (_user_id, token) = testutil::signed_in_user(&ctx, "alice").await;

        log_out(&json!({ "token": token }), &ctx).await.unwrap();
        assert!(ctx.sessions.lookup(&token).await.is_some());
    }

    #[tokio::test]
    async fn refresh_rotates_tokens() {
        let (_dir, ctx) = testutil::context().await;
        let (_user_id, token) = testutil::signed_in_user(&ctx, "alice").await;

        let body = refresh(&json!({ "refreshToken": token }), &ctx).await.unwrap();
        let new_token = body["token"].as_str().unwrap();
        assert_ne!(new_token, token);
        assert!(ctx.sessions.lookup(&token).await.is_none());
        assert!(ctx.sessions.lookup(new_token).await.is_some());

        let err = refresh(&json!({ "refreshToken": token }), &ctx).await.unwrap_err();
        assert_eq!(err.status_code(), 401);
    }

    #[tokio::test]
    async fn change_password_drops_sessions_and_requires_current() {
        let (_dir, ctx) = testutil::context().await;
        let (_user_id, token) = testutil::signed_in_user(&ctx, "alice").await;

        let err = change_password(
            &json!({
                "username": "alice",
                "currentPassword": "wrong",
                "newPassword": "newsecret",
            }),
            &ctx,
        )
        .await
        .unwrap_err();
        assert_eq!(err.status_code(), 403);

        change_password(
            &json!({
                "username": "alice",
                "currentPassword": "secret123",
                "newPassword": "newsecret",
            }),
            &ctx,
        )
        .await
        .unwrap();

        // Existing sessions are gone and the old password no longer works.
        assert!(ctx.sessions.lookup(&token).await.is_none());
        assert!(sign_in(&json!({ "username": "alice", "password": "secret123" }), &ctx)
            .await
            .is_err());
        sign_in(&json!({ "username": "alice", "password": "newsecret" }), &ctx)
            .await
            .unwrap();
    }
}
