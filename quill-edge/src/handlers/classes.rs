//! Class routes.

use axum::{
    body::Bytes,
    extract::{Path, State},
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
struct CreateClassRequest {
    name: String,
    class_id: Option<u64>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateClassRequest {
    name: Option<String>,
    description: Option<String>,
}

pub async fn get_classes(
    State(state): State<EdgeState>,
    headers: HeaderMap,
) -> Result<Response, EdgeError> {
    let payload = with_token(json!({}), bearer_token(&headers));
    relay(&state, TaskKind::GetClasses, payload).await
}

pub async fn get_me_classes(
    State(state): State<EdgeState>,
    headers: HeaderMap,
) -> Result<Response, EdgeError> {
    let payload = with_token(json!({}), bearer_token(&headers));
    relay(&state, TaskKind::GetMeClasses, payload).await
}

pub async fn post_me_classes(
    State(state): State<EdgeState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, EdgeError> {
    let request: CreateClassRequest = parse_json(&body)?;
    let mut payload = json!({ "name": request.name });
    if let Some(class_id) = request.class_id {
        payload["classId"] = json!(class_id);
    }
    if let Some(description) = request.description {
        payload["description"] = json!(description);
    }
    relay(
        &state,
        TaskKind::PostMeClasses,
        with_token(payload, bearer_token(&headers)),
    )
    .await
}

pub async fn put_class(
    State(state): State<EdgeState>,
    Path(class_id): Path<u64>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, EdgeError> {
    let request: UpdateClassRequest = parse_json(&body)?;
    let mut payload = json!({ "classId": class_id });
    if let Some(name) = request.name {
        payload["name"] = json!(name);
    }
    if let Some(description) = request.description {
        payload["description"] = json!(description);
    }
    relay(
        &state,
        TaskKind::PutClass,
        with_token(payload, bearer_token(&headers)),
    )
    .await
}

pub async fn delete_class(
    State(state): State<EdgeState>,
    Path(class_id): Path<u64>,
    headers: HeaderMap,
) -> Result<Response, EdgeError> {
    let payload = with_token(json!({ "classId": class_id }), bearer_token(&headers));
    relay(&state, TaskKind::DeleteClass, payload).await
}

pub async fn get_class_details(
    State(state): State<EdgeState>,
    Path(class_id): Path<u64>,
    headers: HeaderMap,
) -> Result<Response, EdgeError> {
    let payload = with_token(json!({ "classId": class_id }), bearer_token(&headers));
    relay(&state, TaskKind::GetClassDetails, payload).await
}

macro_rules! class_field_route {
    ($name:ident, $kind:expr) => {
        pub async fn $name(
            State(state): State<EdgeState>,
            Path(class_id): Path<u64>,
            headers: HeaderMap,
        ) -> Result<Response, EdgeError> {
            let payload = with_token(json!({ "classId": class_id }), bearer_token(&headers));
            relay(&state, $kind, payload).await
        }
    };
}

class_field_route!(get_class_owner, TaskKind::GetClassOwner);
class_field_route!(get_class_name, TaskKind::GetClassName);
class_field_route!(get_class_description, TaskKind::GetClassDescription);
class_field_route!(get_class_bignote, TaskKind::GetClassBignote);
class_field_route!(get_class_title, TaskKind::GetClassTitle);
