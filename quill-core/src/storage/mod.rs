//! The Data Access Port.
//!
//! Workers resolve every business operation through [`StoragePort`]; the
//! scheduler half of the crate never touches storage directly. Any single
//! call either succeeds or fails with a typed error, and partial writes are
//! never observable to other callers.

pub mod fs;

pub use fs::FsStorage;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    /// Keyed lookup missed; the payload names what was looked up.
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt document {path}: {message}")]
    Corrupt { path: String, message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: u64,
    pub username: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassRecord {
    pub id: u64,
    /// User id of the creator.
    pub owner: u64,
    pub name: String,
    pub description: String,
    /// Enrolled user ids, owner included.
    pub members: Vec<u64>,
}

/// One unit of a class's big note.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteUnit {
    pub unit_id: String,
    pub title: String,
    pub content: String,
}

/// The aggregated note document for a class.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BigNote {
    pub title: String,
    #[serde(default)]
    pub units: Vec<NoteUnit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

impl BigNote {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            units: Vec::new(),
            last_updated: None,
        }
    }
}

/// One entry of a class's big-note history, oldest first on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEvent {
    /// RFC 3339 timestamp.
    pub at: String,
    pub user_id: u64,
    pub action: String,
}

/// Capabilities the Core's handlers run on. Reads are idempotent by key;
/// writes are transactional per call.
#[async_trait]
pub trait StoragePort: Send + Sync {
    // User ops, idempotent by username.
    async fn get_user_by_name(&self, username: &str) -> Result<Option<UserRecord>, StorageError>;
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<UserRecord, StorageError>;
    async fn update_password(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<(), StorageError>;

    // Class ops.
    async fn list_classes(&self) -> Result<Vec<ClassRecord>, StorageError>;
    async fn list_classes_for(&self, user_id: u64) -> Result<Vec<ClassRecord>, StorageError>;
    async fn get_class(&self, id: u64) -> Result<ClassRecord, StorageError>;
    /// `id` of `None` allocates the next sequential id; an explicit taken id
    /// is a conflict.
    async fn create_class(
        &self,
        id: Option<u64>,
        owner: u64,
        name: &str,
        description: &str,
    ) -> Result<ClassRecord, StorageError>;
    async fn put_class(
        &self,
        id: u64,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<(), StorageError>;
    /// Removes the class and its note and history documents.
    async fn delete_class(&self, id: u64) -> Result<(), StorageError>;

    // Note ops, keyed by class.
    async fn get_bignote(&self, class_id: u64) -> Result<Option<BigNote>, StorageError>;
    async fn upsert_bignote(&self, class_id: u64, note: &BigNote) -> Result<(), StorageError>;
    /// Appends a unit (allocating its `unit_<n>` id) to the class's note,
    /// creating the note when absent. Returns the stored note and whether a
    /// note already existed.
    async fn append_unit(
        &self,
        class_id: u64,
        title: &str,
        content: &str,
    ) -> Result<(BigNote, bool), StorageError>;
    async fn read_history(&self, class_id: u64) -> Result<Vec<HistoryEvent>, StorageError>;
    async fn append_history(
        &self,
        class_id: u64,
        event: HistoryEvent,
    ) -> Result<(), StorageError>;
}
