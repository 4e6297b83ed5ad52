//! Bounded priority queue with queue-at-capacity admission.
//!
//! A single heap behind a single mutex. Workers wait on the non-empty
//! condition; the dispatcher never waits (a full queue is an immediate
//! rejection, answered with a "server busy" ERROR upstream). Capacity
//! equals the worker count, so with every worker mid-task total
//! concurrency is bounded at twice the pool size.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::pin::pin;

use tokio::sync::{Mutex, Notify};

use quill_ipc::TaskRecord;

struct QueuedTask {
    /// Recomputed from the kind on enqueue; anything carried on the wire is
    /// ignored.
    priority: u8,
    /// Monotonic insertion sequence, the FIFO tie-break.
    seq: u64,
    task: TaskRecord,
}

// BinaryHeap is a max-heap; order so the lowest (priority, seq) pair is the
// maximum.
impl Ord for QueuedTask {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueuedTask {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for QueuedTask {}

struct QueueState {
    heap: BinaryHeap<QueuedTask>,
    next_seq: u64,
    shutdown: bool,
}

pub struct TaskQueue {
    capacity: usize,
    state: Mutex<QueueState>,
    notify: Notify,
}

impl TaskQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(QueueState {
                heap: BinaryHeap::new(),
                next_seq: 0,
                shutdown: false,
            }),
            notify: Notify::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.heap.len()
    }

    /// Enqueue and signal one waiter, or hand the task back when the queue
    /// is at capacity (or shutting down). Never blocks.
    pub async fn try_push(&self, task: TaskRecord) -> Result<(), TaskRecord> {
        {
            let mut state = self.state.lock().await;
            if state.shutdown || state.heap.len() >= self.capacity {
                return Err(task);
            }
            let seq = state.next_seq;
            state.next_seq += 1;
            state.heap.push(QueuedTask {
                priority: task.kind.priority(),
                seq,
                task,
            });
        }
        self.notify.notify_one();
        Ok(())
    }

    /// Wait for the highest-priority task. Returns `None` once shutdown is
    /// set and the queue has drained.
    pub async fn pop(&self) -> Option<TaskRecord> {
        loop {
            // Register interest before checking state, otherwise a push or
            // shutdown landing between the check and the await is lost.
            let mut notified = pin!(self.notify.notified());
            notified.as_mut().enable();
            {
                let mut state = self.state.lock().await;
                if let Some(queued) = state.heap.pop() {
                    return Some(queued.task);
                }
                if state.shutdown {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Stop accepting work and wake every waiter. Tasks already enqueued are
    /// still drained by `pop`.
    pub async fn shutdown(&self) {
        self.state.lock().await.shutdown = true;
        self.notify.notify_waiters();
    }
}
