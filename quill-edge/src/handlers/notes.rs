//! Big-note routes.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Response,
};
use serde::Deserialize;
use serde_json::json;

use quill_ipc::TaskKind;

use crate::app::EdgeState;
use crate::errors::EdgeError;
use crate::handlers::{bearer_token, parse_json, relay, with_token};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadNoteRequest {
    note_file: String,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EditNoteRequest {
    content: String,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    format: Option<String>,
}

pub async fn upload_note(
    State(state): State<EdgeState>,
    Path(class_id): Path<u64>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, EdgeError> {
    let request: UploadNoteRequest = parse_json(&body)?;
    let mut payload = json!({
        "classId": class_id,
        "noteFile": request.note_file,
    });
    if let Some(title) = request.title {
        payload["title"] = json!(title);
    }
    relay(
        &state,
        TaskKind::PostUploadNote,
        with_token(payload, bearer_token(&headers)),
    )
    .await
}

pub async fn edit_note(
    State(state): State<EdgeState>,
    Path(class_id): Path<u64>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, EdgeError> {
    let request: EditNoteRequest = parse_json(&body)?;
    let mut payload = json!({
        "classId": class_id,
        "content": request.content,
    });
    if let Some(title) = request.title {
        payload["title"] = json!(title);
    }
    relay(
        &state,
        TaskKind::PutBignoteEdit,
        with_token(payload, bearer_token(&headers)),
    )
    .await
}

pub async fn history(
    State(state): State<EdgeState>,
    Path(class_id): Path<u64>,
    headers: HeaderMap,
) -> Result<Response, EdgeError> {
    let payload = with_token(json!({ "classId": class_id }), bearer_token(&headers));
    relay(&state, TaskKind::GetBignoteHistory, payload).await
}

pub async fn export(
    State(state): State<EdgeState>,
    Path(class_id): Path<u64>,
    Query(query): Query<ExportQuery>,
    headers: HeaderMap,
) -> Result<Response, EdgeError> {
    let format = query
        .format
        .ok_or_else(|| EdgeError::bad_request("missing query parameter: format"))?;
    let payload = with_token(
        json!({ "classId": class_id, "format": format }),
        bearer_token(&headers),
    );
    relay(&state, TaskKind::GetBignoteExport, payload).await
}
