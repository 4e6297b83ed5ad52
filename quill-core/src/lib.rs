//! The Core half of the quill pipeline.
//!
//! A single dispatcher loop reads task records off the request channel,
//! applies admission control against a bounded priority queue, and a fixed
//! pool of workers pops tasks, resolves them through the Data Access Port,
//! and sends replies back on the response channel. SYSKILL initiates a
//! cooperative drain-and-exit.

pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod queue;
pub mod session;
pub mod storage;
pub mod workers;

pub use dispatcher::run_core;
pub use error::{CoreError, HandlerError};
pub use handlers::HandlerContext;
pub use queue::TaskQueue;
pub use storage::{FsStorage, StorageError, StoragePort};
