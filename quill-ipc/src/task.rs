//! Task records and the kind/priority tables.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::IpcError;

/// Every operation the pipeline can carry, one tag per HTTP route plus the
/// control-plane kinds (PING, SYSKILL, ERROR).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskKind {
    // System / utility
    Ping,
    Syskill,
    Error,

    // Auth
    Register,
    SignIn,
    LogOut,
    AuthRefresh,
    AuthChangePassword,

    // Classes
    GetClasses,
    GetMeClasses,
    PostMeClasses,
    PutClass,
    DeleteClass,
    GetClassDetails,
    GetClassOwner,
    GetClassName,
    GetClassDescription,
    GetClassBignote,
    GetClassTitle,

    // Notes
    PostUploadNote,
    PutBignoteEdit,
    GetBignoteHistory,
    GetBignoteExport,
}

impl TaskKind {
    /// Scheduling priority. Lower is more urgent.
    ///
    /// Ties are broken FIFO by the queue; the Core always derives priority
    /// from the kind rather than trusting anything carried on the wire.
    pub fn priority(self) -> u8 {
        match self {
            TaskKind::Syskill => 1,
            TaskKind::Ping => 2,
            TaskKind::SignIn => 3,
            TaskKind::Register | TaskKind::AuthRefresh => 4,
            TaskKind::AuthChangePassword | TaskKind::LogOut => 5,
            TaskKind::GetClasses
            | TaskKind::GetMeClasses
            | TaskKind::PostMeClasses
            | TaskKind::GetClassDetails
            | TaskKind::GetClassOwner
            | TaskKind::GetClassName
            | TaskKind::GetClassDescription
            | TaskKind::GetClassBignote
            | TaskKind::GetClassTitle => 6,
            TaskKind::PutClass | TaskKind::DeleteClass | TaskKind::PostUploadNote => 7,
            TaskKind::PutBignoteEdit | TaskKind::GetBignoteHistory | TaskKind::GetBignoteExport => 8,
            TaskKind::Error => 10,
        }
    }

    /// The 8-byte tag this kind is written as on the wire.
    ///
    /// Tags are assigned explicitly so the wire format does not depend on
    /// enum declaration order. Both peers are built from this table.
    pub fn wire_tag(self) -> u64 {
        match self {
            TaskKind::Ping => 0,
            TaskKind::Syskill => 1,
            TaskKind::Error => 2,
            TaskKind::Register => 10,
            TaskKind::SignIn => 11,
            TaskKind::LogOut => 12,
            TaskKind::AuthRefresh => 13,
            TaskKind::AuthChangePassword => 14,
            TaskKind::GetClasses => 20,
            TaskKind::GetMeClasses => 21,
            TaskKind::PostMeClasses => 22,
            TaskKind::PutClass => 23,
            TaskKind::DeleteClass => 24,
            TaskKind::GetClassDetails => 25,
            TaskKind::GetClassOwner => 26,
            TaskKind::GetClassName => 27,
            TaskKind::GetClassDescription => 28,
            TaskKind::GetClassBignote => 29,
            TaskKind::GetClassTitle => 30,
            TaskKind::PostUploadNote => 40,
            TaskKind::PutBignoteEdit => 41,
            TaskKind::GetBignoteHistory => 42,
            TaskKind::GetBignoteExport => 43,
        }
    }

    /// Inverse of [`wire_tag`](Self::wire_tag).
    pub fn from_wire_tag(tag: u64) -> Result<Self, IpcError> {
        let kind = match tag {
            0 => TaskKind::Ping,
            1 => TaskKind::Syskill,
            2 => TaskKind::Error,
            10 => TaskKind::Register,
            11 => TaskKind::SignIn,
            12 => TaskKind::LogOut,
            13 => TaskKind::AuthRefresh,
            14 => TaskKind::AuthChangePassword,
            20 => TaskKind::GetClasses,
            21 => TaskKind::GetMeClasses,
            22 => TaskKind::PostMeClasses,
            23 => TaskKind::PutClass,
            24 => TaskKind::DeleteClass,
            25 => TaskKind::GetClassDetails,
            26 => TaskKind::GetClassOwner,
            27 => TaskKind::GetClassName,
            28 => TaskKind::GetClassDescription,
            29 => TaskKind::GetClassBignote,
            30 => TaskKind::GetClassTitle,
            40 => TaskKind::PostUploadNote,
            41 => TaskKind::PutBignoteEdit,
            42 => TaskKind::GetBignoteHistory,
            43 => TaskKind::GetBignoteExport,
            other => return Err(IpcError::UnknownKind(other)),
        };
        Ok(kind)
    }
}

/// The fixed-shape message exchanged between Edge and Core.
///
/// Exactly one component owns a record at a time; ownership moves with the
/// record through channel, queue, and worker. The Core copies
/// `correlation_id` onto its reply unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub kind: TaskKind,
    /// Unique within an Edge process lifetime; echoed on the reply.
    pub correlation_id: u64,
    /// Stamped by the worker that processed the task. Informational only;
    /// the Edge ignores it.
    pub worker_id: u64,
    /// Free-form JSON; semantics depend on `kind`.
    pub payload: JsonValue,
    /// Reserved for partial-result streaming. Not transmitted.
    #[serde(default, skip_serializing)]
    pub progress: u32,
    /// Reserved for partial-result streaming. Not transmitted.
    #[serde(default, skip_serializing)]
    pub done: bool,
}

impl TaskRecord {
    pub fn new(kind: TaskKind, correlation_id: u64, payload: JsonValue) -> Self {
        Self {
            kind,
            correlation_id,
            worker_id: 0,
            payload,
            progress: 0,
            done: false,
        }
    }

    /// A reply of the originating kind, carrying the request's correlation id.
    pub fn reply(kind: TaskKind, correlation_id: u64, payload: JsonValue) -> Self {
        Self::new(kind, correlation_id, payload)
    }

    /// An ERROR reply with a numeric status code and message in the payload.
    pub fn error_reply(correlation_id: u64, status_code: u16, message: impl Into<String>) -> Self {
        Self::new(
            TaskKind::Error,
            correlation_id,
            serde_json::json!({
                "statusCode": status_code,
                "error": message.into(),
            }),
        )
    }

    pub fn priority(&self) -> u8 {
        self.kind.priority()
    }
}
