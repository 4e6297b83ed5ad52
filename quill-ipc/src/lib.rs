//! IPC layer for the quill request pipeline.
//!
//! The Edge and Core processes exchange fixed-shape [`TaskRecord`]s over a
//! pair of unidirectional byte-stream channels. This crate owns the record
//! type, the wire framing, the channel endpoints, and the startup handshake.

pub mod channel;
pub mod error;
pub mod frame;
pub mod handshake;
pub mod task;

pub use channel::{ChannelReader, ChannelWriter, TaskReader, TaskWriter};
pub use error::IpcError;
pub use task::{TaskKind, TaskRecord};
