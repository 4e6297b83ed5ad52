//! The dispatcher loop.
//!
//! Single consumer of the request channel and the only component that sees
//! SYSKILL. It performs the startup handshake, then reads one task at a
//! time: control-plane tasks end the loop, everything else goes through
//! admission. Business logic never runs here.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use quill_config::CoreConfig;
use quill_ipc::{handshake, IpcError, TaskKind, TaskReader, TaskRecord, TaskWriter};

use crate::error::CoreError;
use crate::handlers::HandlerContext;
use crate::queue::TaskQueue;
use crate::storage::StoragePort;
use crate::workers::WorkerPool;

/// Run the Core against an already-open channel pair. Returns once the loop
/// has exited and every worker has drained and joined.
pub async fn run_core(
    mut reader: TaskReader,
    mut writer: TaskWriter,
    config: &CoreConfig,
    storage: Arc<dyn StoragePort>,
) -> Result<(), CoreError> {
    handshake::core_handshake(&mut reader, &mut writer, config.startup_window()).await?;
    info!(workers = config.workers, "handshake complete, starting workers");

    let context = Arc::new(HandlerContext::new(
        storage,
        config.invalidate_sessions_on_logout,
    ));
    let writer = Arc::new(Mutex::new(writer));
    let queue = Arc::new(TaskQueue::new(config.workers));
    let pool = WorkerPool::spawn(config.workers, queue.clone(), writer.clone(), context);

    let result = dispatch_loop(&mut reader, &queue, &writer).await;

    queue.shutdown().await;
    pool.join().await;
    info!("core drained and stopped");
    result
}

async fn dispatch_loop(
    reader: &mut TaskReader,
    queue: &TaskQueue,
    writer: &Mutex<TaskWriter>,
) -> Result<(), CoreError> {
    loop {
        match reader.read().await {
            Ok(task) if task.kind == TaskKind::Syskill => {
                info!("SYSKILL received, shutting down");
                return Ok(());
            }
            Ok(task) => {
                if let Err(rejected) = queue.try_push(task).await {
                    debug!(
                        correlation_id = rejected.correlation_id,
                        "queue at capacity, rejecting task"
                    );
                    let reply =
                        TaskRecord::error_reply(rejected.correlation_id, 503, "server busy");
                    if let Err(e) = writer.lock().await.send(&reply).await {
                        error!(error = %e, "failed to send busy reply");
                        if e.is_fatal() {
                            return Err(e.into());
                        }
                    }
                }
            }
            Err(IpcError::NoWriters) => {
                warn!("request channel closed by edge, shutting down");
                return Ok(());
            }
            Err(e) if e.is_recoverable() => {
                warn!(error = %e, "discarding undecodable task");
            }
            Err(e) => {
                error!(error = %e, "request channel failed");
                return Err(e.into());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FsStorage;
    use quill_ipc::channel;
    use serde_json::json;
    use std::time::Duration;

    struct CoreUnderTest {
        e2c_tx: TaskWriter,
        c2e_rx: TaskReader,
        handle: tokio::task::JoinHandle<Result<(), CoreError>>,
        _dir: tempfile::TempDir,
    }

    async fn start_core(workers: usize) -> CoreUnderTest {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(FsStorage::open(dir.path()).await.unwrap());
        let config = CoreConfig {
            workers,
            startup_window_ms: 1_000,
            invalidate_sessions_on_logout: true,
        };

        let (mut e2c_tx, e2c_rx) = channel::boxed_pair(64 * 1024);
        let (c2e_tx, mut c2e_rx) = channel::boxed_pair(64 * 1024);

        let handle = tokio::spawn(async move {
            run_core(e2c_rx, c2e_tx, &config, storage).await
        });

        // Drive the edge half of the handshake.
        handshake::edge_handshake(&mut e2c_tx, &mut c2e_rx, Duration::from_secs(1))
            .await
            .unwrap();

        CoreUnderTest {
            e2c_tx,
            c2e_rx,
            handle,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn ping_round_trip() {
        let mut core = start_core(2).await;

        core.e2c_tx
            .send(&TaskRecord::new(TaskKind::Ping, 1, json!({})))
            .await
            .unwrap();
        let reply = core.c2e_rx.read().await.unwrap();
        assert_eq!(reply.kind, TaskKind::Ping);
        assert_eq!(reply.correlation_id, 1);
        assert_eq!(reply.payload["message"], "pong!");

        core.e2c_tx
            .send(&TaskRecord::new(TaskKind::Syskill, 0, json!({})))
            .await
            .unwrap();
        core.handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn syskill_drains_and_exits() {
        let mut core = start_core(1).await;

        for id in 1..=3u64 {
            core.e2c_tx
                .send(&TaskRecord::new(TaskKind::Ping, id, json!({})))
                .await
                .unwrap();
        }
        core.e2c_tx
            .send(&TaskRecord::new(TaskKind::Syskill, 0, json!({})))
            .await
            .unwrap();

        core.handle.await.unwrap().unwrap();

        // Every task sent before SYSKILL is answered exactly once: a pong
        // when admitted, a busy ERROR when dropped.
        let mut replies = 0;
        while let Ok(Some(_)) = core
            .c2e_rx
            .read_with_deadline(Duration::from_millis(200))
            .await
        {
            replies += 1;
        }
        assert_eq!(replies, 3);
    }

    #[tokio::test]
    async fn closed_edge_channel_shuts_the_core_down() {
        let core = start_core(1).await;
        drop(core.e2c_tx);
        core.handle.await.unwrap().unwrap();
    }
}
