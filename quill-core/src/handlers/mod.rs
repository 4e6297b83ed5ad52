//! Per-kind business handlers.
//!
//! A worker hands a task here; it comes back as a reply record. Handler
//! failures never unwind: they become ERROR replies carrying a numeric
//! `statusCode` and an `error` message. A missing or mistyped payload
//! field is a 400, not a panic.

pub mod auth;
pub mod classes;
pub mod notes;

use std::sync::Arc;

use serde_json::{json, Value as JsonValue};
use tracing::debug;

use quill_ipc::{TaskKind, TaskRecord};

use crate::error::HandlerError;
use crate::session::{Session, SessionStore};
use crate::storage::StoragePort;

/// Everything a handler may touch: the Data Access Port, the session table,
/// and the knobs that change handler behavior.
pub struct HandlerContext {
    pub storage: Arc<dyn StoragePort>,
    pub sessions: SessionStore,
    pub invalidate_sessions_on_logout: bool,
}

impl HandlerContext {
    pub fn new(storage: Arc<dyn StoragePort>, invalidate_sessions_on_logout: bool) -> Self {
        Self {
            storage,
            sessions: SessionStore::new(),
            invalidate_sessions_on_logout,
        }
    }
}

/// Resolve a task into its reply. Always returns a record; the worker loop
/// never sees an error from here.
pub async fn dispatch(task: TaskRecord, context: &HandlerContext) -> TaskRecord {
    let kind = task.kind;
    let correlation_id = task.correlation_id;
    let worker_id = task.worker_id;

    let mut reply = match route(kind, &task.payload, context).await {
        Ok(body) => TaskRecord::reply(kind, correlation_id, body),
        Err(e) => {
            debug!(?kind, correlation_id, status = e.status_code(), error = %e, "handler failed");
            TaskRecord::error_reply(correlation_id, e.status_code(), e.to_string())
        }
    };
    reply.worker_id = worker_id;
    reply
}

async fn route(
    kind: TaskKind,
    payload: &JsonValue,
    ctx: &HandlerContext,
) -> Result<JsonValue, HandlerError> {
    match kind {
        TaskKind::Ping => Ok(json!({ "message": "pong!" })),

        TaskKind::Register => auth::register(payload, ctx).await,
        TaskKind::SignIn => auth::sign_in(payload, ctx).await,
        TaskKind::LogOut => auth::log_out(payload, ctx).await,
        TaskKind::AuthRefresh => auth::refresh(payload, ctx).await,
        TaskKind::AuthChangePassword => auth::change_password(payload, ctx).await,

        TaskKind::GetClasses => classes::get_classes(payload, ctx).await,
        TaskKind::GetMeClasses => classes::get_me_classes(payload, ctx).await,
        TaskKind::PostMeClasses => classes::create_class(payload, ctx).await,
        TaskKind::PutClass => classes::update_class(payload, ctx).await,
        TaskKind::DeleteClass => classes::delete_class(payload, ctx).await,
        TaskKind::GetClassDetails => classes::get_details(payload, ctx).await,
        TaskKind::GetClassOwner
        | TaskKind::GetClassName
        | TaskKind::GetClassDescription
        | TaskKind::GetClassBignote
        | TaskKind::GetClassTitle => classes::get_field(kind, payload, ctx).await,

        TaskKind::PostUploadNote => notes::upload_note(payload, ctx).await,
        TaskKind::PutBignoteEdit => notes::edit_bignote(payload, ctx).await,
        TaskKind::GetBignoteHistory => notes::history(payload, ctx).await,
        TaskKind::GetBignoteExport => notes::export(payload, ctx).await,

        // Control-plane kinds are the dispatcher's business; one reaching a
        // worker is a bug upstream, answered rather than crashed on.
        TaskKind::Syskill | TaskKind::Error => {
            Err(HandlerError::bad_request("task kind is not routable"))
        }
    }
}

// ── payload field helpers ────────────────────────────────────────────────

pub(crate) fn require_str<'a>(
    payload: &'a JsonValue,
    field: &str,
) -> Result<&'a str, HandlerError> {
    payload
        .get(field)
        .and_then(JsonValue::as_str)
        .ok_or_else(|| HandlerError::bad_request(format!("missing field: {}", field)))
}

pub(crate) fn optional_str<'a>(payload: &'a JsonValue, field: &str) -> Option<&'a str> {
    payload.get(field).and_then(JsonValue::as_str)
}

pub(crate) fn require_u64(payload: &JsonValue, field: &str) -> Result<u64, HandlerError> {
    payload
        .get(field)
        .and_then(JsonValue::as_u64)
        .ok_or_else(|| HandlerError::bad_request(format!("missing field: {}", field)))
}

pub(crate) fn optional_u64(payload: &JsonValue, field: &str) -> Option<u64> {
    payload.get(field).and_then(JsonValue::as_u64)
}

/// Resolve the payload's bearer token into a session, or 401.
pub(crate) async fn authenticate(
    payload: &JsonValue,
    ctx: &HandlerContext,
) -> Result<Session, HandlerError> {
    let token = optional_str(payload, "token")
        .ok_or_else(|| HandlerError::unauthorized("missing bearer token"))?;
    ctx.sessions
        .lookup(token)
        .await
        .ok_or_else(|| HandlerError::unauthorized("invalid or expired token"))
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use crate::storage::FsStorage;

    /// A context over a throwaway data directory. Keep the TempDir alive for
    /// the duration of the test.
    pub(crate) async fn context() -> (tempfile::TempDir, HandlerContext) {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::open(dir.path()).await.unwrap();
        (dir, HandlerContext::new(Arc::new(storage), true))
    }

    /// Register a user and sign them in; returns (user_id, token).
    pub(crate) async fn signed_in_user(ctx: &HandlerContext, username: &str) -> (u64, String) {
        let body = auth::register(
            &json!({ "username": username, "password": "secret123" }),
            ctx,
        )
        .await
        .unwrap();
        let user_id = body["userId"].as_u64().unwrap();

        let body = auth::sign_in(
            &json!({ "username": username, "password": "secret123" }),
            ctx,
        )
        .await
        .unwrap();
        (user_id, body["token"].as_str().unwrap().to_string())
    }
}
