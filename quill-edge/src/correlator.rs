//! Request/response correlation.
//!
//! Concurrent HTTP handlers share one request-channel writer (serialized by
//! a mutex) and one background reader that owns the response channel. Each
//! in-flight request is a pending-table entry mapping its correlation id to
//! a oneshot sender; the reader delivers replies by id and discards replies
//! whose entry is gone (the handler timed out first). Entry states are
//! monotonic: waiting while the entry exists, delivered when the sender is
//! consumed, timed out once the entry is removed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value as JsonValue};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use quill_ipc::{TaskKind, TaskReader, TaskRecord, TaskWriter};

use crate::errors::EdgeError;

pub struct Correlator {
    writer: Mutex<TaskWriter>,
    pending: Mutex<HashMap<u64, oneshot::Sender<TaskRecord>>>,
    /// Handshake uses id 0; live requests start at 1.
    next_id: AtomicU64,
    healthy: AtomicBool,
    reply_timeout: Duration,
}

impl Correlator {
    pub fn new(writer: TaskWriter, reply_timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            writer: Mutex::new(writer),
            pending: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            healthy: AtomicBool::new(true),
            reply_timeout,
        })
    }

    /// Whether the response channel is still delivering.
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    /// Start the background reader that owns the response channel. Runs
    /// until the channel dies, then fails every outstanding waiter and
    /// marks the Edge unhealthy.
    pub fn spawn_reader(self: &Arc<Self>, mut reader: TaskReader) -> JoinHandle<()> {
        let correlator = self.clone();
        tokio::spawn(async move {
            loop {
                match reader.read().await {
                    Ok(reply) => correlator.deliver(reply).await,
                    Err(e) if e.is_recoverable() => {
                        warn!(error = %e, "discarding undecodable reply");
                    }
                    Err(e) => {
                        if correlator.is_healthy() {
                            error!(error = %e, "response channel failed");
                        } else {
                            debug!(error = %e, "response channel closed");
                        }
                        break;
                    }
                }
            }
            correlator.healthy.store(false, Ordering::Release);
            correlator.fail_outstanding().await;
        })
    }

    /// Send a task and wait for its reply, up to the configured deadline.
    pub async fn call(&self, kind: TaskKind, payload: JsonValue) -> Result<TaskRecord, EdgeError> {
        self.call_with_timeout(kind, payload, self.reply_timeout).await
    }

    pub async fn call_with_timeout(
        &self,
        kind: TaskKind,
        payload: JsonValue,
        deadline: Duration,
    ) -> Result<TaskRecord, EdgeError> {
        if !self.is_healthy() {
            return Err(EdgeError::Unavailable);
        }

        let correlation_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(correlation_id, tx);

        let task = TaskRecord::new(kind, correlation_id, payload);
        if let Err(e) = self.writer.lock().await.send(&task).await {
            self.pending.lock().await.remove(&correlation_id);
            error!(correlation_id, error = %e, "task send failed");
            if e.is_fatal() {
                self.healthy.store(false, Ordering::Release);
            }
            return Err(EdgeError::SendFailed);
        }

        match tokio::time::timeout(deadline, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            // Sender dropped without a reply: the reader died and failed us.
            Ok(Err(_)) => Err(EdgeError::Unavailable),
            Err(_) => {
                // Remove the entry so the late reply is discarded and the
                // table does not leak.
                self.pending.lock().await.remove(&correlation_id);
                debug!(correlation_id, "reply deadline expired");
                Err(EdgeError::Timeout)
            }
        }
    }

    /// Fire-and-forget control-plane send (SYSKILL). No pending entry.
    pub async fn send_control(&self, kind: TaskKind) -> Result<(), EdgeError> {
        let task = TaskRecord::new(kind, 0, json!({}));
        self.writer.lock().await.send(&task).await.map_err(|e| {
            if e.is_fatal() {
                self.healthy.store(false, Ordering::Release);
            }
            EdgeError::SendFailed
        })
    }

    /// Number of in-flight entries; used by shutdown and tests.
    pub async fn pending_len(&self) -> usize {
        self.pending.lock().await.len()
    }

    async fn deliver(&self, reply: TaskRecord) {
        let waiter = self.pending.lock().await.remove(&reply.correlation_id);
        match waiter {
            // A send failure means the handler is gone; nothing to do.
            Some(tx) => {
                let _ = tx.send(reply);
            }
            None => {
                debug!(
                    correlation_id = reply.correlation_id,
                    "late reply discarded"
                );
            }
        }
    }

    async fn fail_outstanding(&self) {
        let mut pending = self.pending.lock().await;
        if !pending.is_empty() {
            warn!(waiters = pending.len(), "failing outstanding requests");
        }
        // Dropping the senders completes every waiter with Unavailable.
        pending.clear();
    }
}
