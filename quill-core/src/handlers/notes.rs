//! Big-note handlers: upload, edit, history, export.
//!
//! Each class has at most one big note, a titled list of units. Uploads
//! append units; edits either replace the document (when the submitted
//! content is itself a big-note JSON document) or append an "edited" unit.

use chrono::Utc;
use serde_json::{json, Value as JsonValue};
use tracing::info;

use crate::error::HandlerError;
use crate::handlers::{authenticate, optional_str, require_str, require_u64, HandlerContext};
use crate::storage::{BigNote, ClassRecord, HistoryEvent, NoteUnit};

async fn member_class(
    payload: &JsonValue,
    ctx: &HandlerContext,
) -> Result<(u64, ClassRecord), HandlerError> {
    let session = authenticate(payload, ctx).await?;
    let class_id = require_u64(payload, "classId")?;
    let class = ctx.storage.get_class(class_id).await?;
    if !class.members.contains(&session.user_id) {
        return Err(HandlerError::Forbidden(
            "user is not enrolled in this class".to_string(),
        ));
    }
    Ok((session.user_id, class))
}

pub async fn upload_note(
    payload: &JsonValue,
    ctx: &HandlerContext,
) -> Result<JsonValue, HandlerError> {
    let (user_id, class) = member_class(payload, ctx).await?;
    let content = require_str(payload, "noteFile")?;
    let title = optional_str(payload, "title").unwrap_or("Uploaded Note");

    if content.is_empty() {
        return Err(HandlerError::bad_request("uploaded note is empty"));
    }

    let (note, updated) = ctx.storage.append_unit(class.id, title, content).await?;
    ctx.storage
        .append_history(
            class.id,
            HistoryEvent {
                at: Utc::now().to_rfc3339(),
                user_id,
                action: "upload-note".to_string(),
            },
        )
        .await?;
    info!(class_id = class.id, units = note.units.len(), "note uploaded");

    Ok(json!({
        "message": "note uploaded",
        "updated": updated,
    }))
}

pub async fn edit_bignote(
    payload: &JsonValue,
    ctx: &HandlerContext,
) -> Result<JsonValue, HandlerError> {
    let (user_id, class) = member_class(payload, ctx).await?;
    let content = require_str(payload, "content")?;
    let title = optional_str(payload, "title");

    let mut note = ctx
        .storage
        .get_bignote(class.id)
        .await?
        .unwrap_or_else(|| BigNote::new(title.unwrap_or(&class.name)));

    // Content that is itself a big-note document replaces the unit list
    // wholesale; anything else lands as a new unit.
    match serde_json::from_str::<BigNote>(content) {
        Ok(document) => note = document,
        Err(_) => {
            note.units.push(NoteUnit {
                unit_id: format!("unit_edited_{}", Utc::now().timestamp()),
                title: title.unwrap_or("Edited Note").to_string(),
                content: content.to_string(),
            });
        }
    }
    if let Some(title) = title {
        note.title = title.to_string();
    }

    let last_updated = Utc::now().to_rfc3339();
    note.last_updated = Some(last_updated.clone());

    ctx.storage.upsert_bignote(class.id, &note).await?;
    ctx.storage
        .append_history(
            class.id,
            HistoryEvent {
                at: last_updated.clone(),
                user_id,
                action: "edit-note".to_string(),
            },
        )
        .await?;
    info!(class_id = class.id, "note edited");

    Ok(json!({
        "message": "note updated",
        "lastUpdated": last_updated,
    }))
}

pub async fn history(
    payload: &JsonValue,
    ctx: &HandlerContext,
) -> Result<JsonValue, HandlerError> {
    let (_user_id, class) = member_class(payload, ctx).await?;
    let events = ctx.storage.read_history(class.id).await?;
    Ok(json!({ "history": events }))
}

/// Export is a stub: the format is validated and acknowledged, nothing is
/// rendered.
pub async fn export(
    payload: &JsonValue,
    ctx: &HandlerContext,
) -> Result<JsonValue, HandlerError> {
    let (_user_id, _class) = member_class(payload, ctx).await?;
    let format = require_str(payload, "format")?;

    match format {
        "PDF" | "Markdown" => Ok(json!({
            "message": format!("export as {} queued", format),
        })),
        other => Err(HandlerError::bad_request(format!(
            "unsupported export format: {}",
            other
        ))),
    }
}
