//! In-memory session table.
//!
//! Tokens and session ids are UUID v4 strings minted at sign-in. The table
//! lives in the Core process and dies with it; nothing is persisted.

use std::collections::HashMap;

use tokio::sync::RwLock;
use uuid::Uuid;

/// An authenticated session resolved from a bearer token.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: u64,
    pub session_id: String,
}

/// Token → session map.
#[derive(Default)]
pub struct SessionStore {
    inner: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a token and session id for a user.
    pub async fn issue(&self, user_id: u64) -> (String, String) {
        let token = Uuid::new_v4().to_string();
        let session_id = Uuid::new_v4().to_string();
        self.inner.write().await.insert(
            token.clone(),
            Session {
                user_id,
                session_id: session_id.clone(),
            },
        );
        (token, session_id)
    }

    pub async fn lookup(&self, token: &str) -> Option<Session> {
        self.inner.read().await.get(token).cloned()
    }

    /// Drop one token. Returns whether it named a live session.
    pub async fn revoke(&self, token: &str) -> bool {
        self.inner.write().await.remove(token).is_some()
    }

    /// Drop every session belonging to a user.
    pub async fn revoke_user(&self, user_id: u64) {
        self.inner
            .write()
            .await
            .retain(|_, session| session.user_id != user_id);
    }

    /// Exchange a live token for a fresh one on the same session. The old
    /// token stops working.
    pub async fn refresh(&self, token: &str) -> Option<String> {
        let mut table = self.inner.write().await;
        let session = table.remove(token)?;
        let new_token = Uuid::new_v4().to_string();
        table.insert(new_token.clone(), session);
        Some(new_token)
    }
}
