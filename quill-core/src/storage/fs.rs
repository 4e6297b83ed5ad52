//! Filesystem-backed Data Access Port.
//!
//! Documents live under the configured data directory: `users.json` and
//! `classes.json` hold arrays of records, and each class's big note and
//! history are separate JSON files under `notes/`. Every write is a
//! read-modify-write under that document's async mutex, taken from a map
//! guarded by a global sync lock; the global lock is never held across I/O.
//! Writes land in a temp file renamed over the target, so a reader sees
//! either the old or the new document, never a partial one.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as SyncMutex};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

use super::{
    BigNote, ClassRecord, HistoryEvent, NoteUnit, StorageError, StoragePort, UserRecord,
};

pub struct FsStorage {
    data_dir: PathBuf,
    locks: SyncMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl FsStorage {
    /// Open (and create, if needed) the data directory layout.
    pub async fn open(data_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let data_dir = data_dir.into();
        tokio::fs::create_dir_all(data_dir.join("notes")).await?;
        debug!(data_dir = %data_dir.display(), "storage opened");
        Ok(Self {
            data_dir,
            locks: SyncMutex::new(HashMap::new()),
        })
    }

    fn users_path(&self) -> PathBuf {
        self.data_dir.join("users.json")
    }

    fn classes_path(&self) -> PathBuf {
        self.data_dir.join("classes.json")
    }

    fn note_path(&self, class_id: u64) -> PathBuf {
        self.data_dir.join("notes").join(format!("class_{}_note.json", class_id))
    }

    fn history_path(&self, class_id: u64) -> PathBuf {
        self.data_dir
            .join("notes")
            .join(format!("class_{}_history.json", class_id))
    }

    /// Fetch the per-document mutex, creating it on first use. The global
    /// map lock is held only for the lookup, never across I/O.
    fn lock_for(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut map = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        map.entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    async fn read_document<T>(&self, path: &Path) -> Result<T, StorageError>
    where
        T: DeserializeOwned + Default,
    {
        match tokio::fs::read(path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| StorageError::Corrupt {
                path: path.display().to_string(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_document<T>(&self, path: &Path, value: &T) -> Result<(), StorageError>
    where
        T: Serialize,
    {
        let bytes = serde_json::to_vec_pretty(value).map_err(|e| StorageError::Corrupt {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    async fn read_note(&self, class_id: u64) -> Result<Option<BigNote>, StorageError> {
        match tokio::fs::read(self.note_path(class_id)).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StorageError::Corrupt {
                    path: self.note_path(class_id).display().to_string(),
                    message: e.to_string(),
                }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl StoragePort for FsStorage {
    async fn get_user_by_name(&self, username: &str) -> Result<Option<UserRecord>, StorageError> {
        let users: Vec<UserRecord> = self.read_document(&self.users_path()).await?;
        Ok(users.into_iter().find(|u| u.username == username))
    }

    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<UserRecord, StorageError> {
        let guard = self.lock_for("users");
        let _held = guard.lock().await;

        let mut users: Vec<UserRecord> = self.read_document(&self.users_path()).await?;
        if users.iter().any(|u| u.username == username) {
            return Err(StorageError::Conflict(format!(
                "user {} already exists",
                username
            )));
        }
        let user = UserRecord {
            id: users.iter().map(|u| u.id).max().unwrap_or(0) + 1,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
        };
        users.push(user.clone());
        self.write_document(&self.users_path(), &users).await?;
        Ok(user)
    }

    async fn update_password(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<(), StorageError> {
        let guard = self.lock_for("users");
        let _held = guard.lock().await;

        let mut users: Vec<UserRecord> = self.read_document(&self.users_path()).await?;
        let user = users
            .iter_mut()
            .find(|u| u.username == username)
            .ok_or_else(|| StorageError::NotFound(format!("user {}", username)))?;
        user.password_hash = password_hash.to_string();
        self.write_document(&self.users_path(), &users).await
    }

    async fn list_classes(&self) -> Result<Vec<ClassRecord>, StorageError> {
        self.read_document(&self.classes_path()).await
    }

    async fn list_classes_for(&self, user_id: u64) -> Result<Vec<ClassRecord>, StorageError> {
        let classes: Vec<ClassRecord> = self.read_document(&self.classes_path()).await?;
        Ok(classes
            .into_iter()
            .filter(|c| c.members.contains(&user_id))
            .collect())
    }

    async fn get_class(&self, id: u64) -> Result<ClassRecord, StorageError> {
        let classes: Vec<ClassRecord> = self.read_document(&self.classes_path()).await?;
        classes
            .into_iter()
            .find(|c| c.id == id)
            .ok_or_else(|| StorageError::NotFound(format!("class {}", id)))
    }

    async fn create_class(
        &self,
        id: Option<u64>,
        owner: u64,
        name: &str,
        description: &str,
    ) -> Result<ClassRecord, StorageError> {
        let guard = self.lock_for("classes");
        let _held = guard.lock().await;

        let mut classes: Vec<ClassRecord> = self.read_document(&self.classes_path()).await?;
        let id = match id {
            Some(wanted) => {
                if classes.iter().any(|c| c.id == wanted) {
                    return Err(StorageError::Conflict(format!("class {} already exists", wanted)));
                }
                wanted
            }
            None => classes.iter().map(|c| c.id).max().unwrap_or(0) + 1,
        };
        let class = ClassRecord {
            id,
            owner,
            name: name.to_string(),
            description: description.to_string(),
            members: vec![owner],
        };
        classes.push(class.clone());
        self.write_document(&self.classes_path(), &classes).await?;
        Ok(class)
    }

    async fn put_class(
        &self,
        id: u64,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<(), StorageError> {
        let guard = self.lock_for("classes");
        let _held = guard.lock().await;

        let mut classes: Vec<ClassRecord> = self.read_document(&self.classes_path()).await?;
        let class = classes
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| StorageError::NotFound(format!("class {}", id)))?;
        if let Some(name) = name {
            class.name = name.to_string();
        }
        if let Some(description) = description {
            class.description = description.to_string();
        }
        self.write_document(&self.classes_path(), &classes).await
    }

    async fn delete_class(&self, id: u64) -> Result<(), StorageError> {
        let guard = self.lock_for("classes");
        let _held = guard.lock().await;

        let mut classes: Vec<ClassRecord> = self.read_document(&self.classes_path()).await?;
        let before = classes.len();
        classes.retain(|c| c.id != id);
        if classes.len() == before {
            return Err(StorageError::NotFound(format!("class {}", id)));
        }
        self.write_document(&self.classes_path(), &classes).await?;

        // Note and history removal is best-effort; a missing file is fine.
        for path in [self.note_path(id), self.history_path(id)] {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    async fn get_bignote(&self, class_id: u64) -> Result<Option<BigNote>, StorageError> {
        self.read_note(class_id).await
    }

    async fn upsert_bignote(&self, class_id: u64, note: &BigNote) -> Result<(), StorageError> {
        let guard = self.lock_for(&format!("note:{}", class_id));
        let _held = guard.lock().await;
        self.write_document(&self.note_path(class_id), note).await
    }

    async fn append_unit(
        &self,
        class_id: u64,
        title: &str,
        content: &str,
    ) -> Result<(BigNote, bool), StorageError> {
        let guard = self.lock_for(&format!("note:{}", class_id));
        let _held = guard.lock().await;

        let existing = self.read_note(class_id).await?;
        let existed = existing.is_some();
        let mut note = existing.unwrap_or_else(|| BigNote::new(title));
        note.units.push(NoteUnit {
            unit_id: format!("unit_{}", note.units.len() + 1),
            title: title.to_string(),
            content: content.to_string(),
        });
        self.write_document(&self.note_path(class_id), &note).await?;
        Ok((note, existed))
    }

    async fn read_history(&self, class_id: u64) -> Result<Vec<HistoryEvent>, StorageError> {
        self.read_document(&self.history_path(class_id)).await
    }

    async fn append_history(
        &self,
        class_id: u64,
        event: HistoryEvent,
    ) -> Result<(), StorageError> {
        let guard = self.lock_for(&format!("history:{}", class_id));
        let _held = guard.lock().await;

        let mut events: Vec<HistoryEvent> = self.read_document(&self.history_path(class_id)).await?;
        events.push(event);
        self.write_document(&self.history_path(class_id), &events).await
    }
}
