//! The worker pool.
//!
//! N tokio tasks share the queue. A worker pops the highest-priority task,
//! stamps its id, runs the kind's handler, and sends the reply on the shared
//! response writer. Handlers never unwind out of the loop; every failure is
//! already an ERROR reply by the time it gets here. The queue lock is never
//! held while a handler runs.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use quill_ipc::TaskWriter;

use crate::handlers::{self, HandlerContext};
use crate::queue::TaskQueue;

pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Start `count` workers against the shared queue and response writer.
    pub fn spawn(
        count: usize,
        queue: Arc<TaskQueue>,
        writer: Arc<Mutex<TaskWriter>>,
        context: Arc<HandlerContext>,
    ) -> Self {
        let handles = (0..count)
            .map(|i| {
                let worker_id = (i + 1) as u64;
                tokio::spawn(worker_loop(
                    worker_id,
                    queue.clone(),
                    writer.clone(),
                    context.clone(),
                ))
            })
            .collect();
        Self { handles }
    }

    /// Wait for every worker to exit. Called after the queue is shut down.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(error = %e, "worker task failed to join");
            }
        }
    }
}

async fn worker_loop(
    worker_id: u64,
    queue: Arc<TaskQueue>,
    writer: Arc<Mutex<TaskWriter>>,
    context: Arc<HandlerContext>,
) {
    debug!(worker_id, "worker started");
    while let Some(mut task) = queue.pop().await {
        task.worker_id = worker_id;
        debug!(
            worker_id,
            kind = ?task.kind,
            correlation_id = task.correlation_id,
            "task dispatched"
        );

        let reply = handlers::dispatch(task, &context).await;

        let mut writer = writer.lock().await;
        if let Err(e) = writer.send(&reply).await {
            error!(worker_id, error = %e, "failed to send reply");
            if e.is_fatal() {
                break;
            }
        }
    }
    debug!(worker_id, "worker exiting");
}
