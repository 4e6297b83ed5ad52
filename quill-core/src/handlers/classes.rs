//! Class handlers: listing, CRUD, and single-field reads.

use serde_json::{json, Value as JsonValue};
use tracing::info;

use quill_ipc::TaskKind;

use crate::error::HandlerError;
use crate::handlers::{authenticate, optional_str, optional_u64, require_str, require_u64, HandlerContext};
use crate::storage::ClassRecord;

fn class_json(class: &ClassRecord) -> JsonValue {
    json!({
        "id": class.id,
        "owner": class.owner,
        "name": class.name,
        "description": class.description,
    })
}

fn require_member(class: &ClassRecord, user_id: u64) -> Result<(), HandlerError> {
    if class.members.contains(&user_id) {
        Ok(())
    } else {
        Err(HandlerError::Forbidden(
            "user is not enrolled in this class".to_string(),
        ))
    }
}

fn require_owner(class: &ClassRecord, user_id: u64) -> Result<(), HandlerError> {
    if class.owner == user_id {
        Ok(())
    } else {
        Err(HandlerError::Forbidden(
            "only the class owner can do this".to_string(),
        ))
    }
}

pub async fn get_classes(
    payload: &JsonValue,
    ctx: &HandlerContext,
) -> Result<JsonValue, HandlerError> {
    authenticate(payload, ctx).await?;
    let classes = ctx.storage.list_classes().await?;
    Ok(json!({
        "classes": classes.iter().map(class_json).collect::<Vec<_>>(),
    }))
}

pub async fn get_me_classes(
    payload: &JsonValue,
    ctx: &HandlerContext,
) -> Result<JsonValue, HandlerError> {
    let session = authenticate(payload, ctx).await?;
    let classes = ctx.storage.list_classes_for(session.user_id).await?;
    Ok(json!({
        "classes": classes.iter().map(class_json).collect::<Vec<_>>(),
    }))
}

pub async fn create_class(
    payload: &JsonValue,
    ctx: &HandlerContext,
) -> Result<JsonValue, HandlerError> {
    let session = authenticate(payload, ctx).await?;
    let name = require_str(payload, "name")?;
    let class_id = optional_u64(payload, "classId");
    let description = optional_str(payload, "description").unwrap_or_default();

    if name.is_empty() {
        return Err(HandlerError::bad_request("name must not be empty"));
    }

    let class = ctx
        .storage
        .create_class(class_id, session.user_id, name, description)
        .await?;
    info!(class_id = class.id, owner = class.owner, "class created");

    Ok(json!({ "classId": class.id }))
}

pub async fn update_class(
    payload: &JsonValue,
    ctx: &HandlerContext,
) -> Result<JsonValue, HandlerError> {
    let session = authenticate(payload, ctx).await?;
    let class_id = require_u64(payload, "classId")?;
    let name = optional_str(payload, "name");
    let description = optional_str(payload, "description");

    let class = ctx.storage.get_class(class_id).await?;
    require_owner(&class, session.user_id)?;

    ctx.storage.put_class(class_id, name, description).await?;
    Ok(json!({ "message": "class updated" }))
}

pub async fn delete_class(
    payload: &JsonValue,
    ctx: &HandlerContext,
) -> Result<JsonValue, HandlerError> {
    let session = authenticate(payload, ctx).await?;
    let class_id = require_u64(payload, "classId")?;

    let class = ctx.storage.get_class(class_id).await?;
    require_owner(&class, session.user_id)?;

    ctx.storage.delete_class(class_id).await?;
    info!(class_id, "class deleted");
    Ok(json!({ "message": "class deleted" }))
}

pub async fn get_details(
    payload: &JsonValue,
    ctx: &HandlerContext,
) -> Result<JsonValue, HandlerError> {
    let session = authenticate(payload, ctx).await?;
    let class_id = require_u64(payload, "classId")?;

    let class = ctx.storage.get_class(class_id).await?;
    require_member(&class, session.user_id)?;

    let note = ctx.storage.get_bignote(class_id).await?;
    let (big_note, title) = match note {
        Some(note) => (json!(note.units), note.title),
        None => (json!({}), class.name.clone()),
    };

    Ok(json!({
        "id": class.id,
        "owner": class.owner,
        "name": class.name,
        "description": class.description,
        "bigNote": big_note,
        "title": title,
    }))
}

/// The five single-field reads share one shape: resolve the class, check
/// membership, project the field.
pub async fn get_field(
    kind: TaskKind,
    payload: &JsonValue,
    ctx: &HandlerContext,
) -> Result<JsonValue, HandlerError> {
    let session = authenticate(payload, ctx).await?;
    let class_id = require_u64(payload, "classId")?;

    let class = ctx.storage.get_class(class_id).await?;
    require_member(&class, session.user_id)?;

    let body = match kind {
        TaskKind::GetClassOwner => json!({ "owner": class.owner }),
        TaskKind::GetClassName => json!({ "name": class.name }),
        TaskKind::GetClassDescription => json!({ "description": class.description }),
        TaskKind::GetClassBignote => {
            let note = ctx.storage.get_bignote(class_id).await?;
            match note {
                Some(note) => json!({ "bigNote": note.units }),
                None => json!({ "bigNote": {} }),
            }
        }
        TaskKind::GetClassTitle => {
            let note = ctx.storage.get_bignote(class_id).await?;
            let title = note.map(|n| n.title).unwrap_or_else(|| class.name.clone());
            json!({ "title": title })
        }
        other => {
            return Err(HandlerError::Internal(format!(
                "{:?} is not a class field read",
                other
            )))
        }
    };
    Ok(body)
}
