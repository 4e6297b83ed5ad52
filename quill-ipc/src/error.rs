//! IPC error types

use thiserror::Error;

/// Errors produced by channel endpoints and the wire codec.
#[derive(Debug, Error)]
pub enum IpcError {
    /// Payload could not be serialized to JSON
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Payload bytes were not valid JSON
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Underlying stream error
    #[error("io error: {0}")]
    Io(String),

    /// Clean EOF at a frame boundary: the peer closed its end of the channel
    #[error("no writers attached")]
    NoWriters,

    /// EOF in the middle of a frame
    #[error("truncated frame")]
    Truncated,

    /// Length word exceeds the accepted maximum (corrupt header)
    #[error("frame payload length {0} exceeds maximum")]
    PayloadTooLarge(u32),

    /// Kind tag does not name a known task kind
    #[error("unknown kind tag: {0}")]
    UnknownKind(u64),

    /// Startup handshake did not complete
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// Deadline expired before a frame arrived
    #[error("timed out waiting for peer")]
    Timeout,
}

impl IpcError {
    /// Whether the channel is still frame-aligned after this error.
    ///
    /// A recoverable error consumed exactly one (bad) frame; the caller may
    /// keep reading. Anything else means the stream state is unknown and the
    /// channel must be abandoned.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, IpcError::UnknownKind(_) | IpcError::Deserialization(_))
    }

    /// Whether this error means the peer is gone for good.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            IpcError::NoWriters | IpcError::Truncated | IpcError::Io(_) | IpcError::PayloadTooLarge(_)
        )
    }
}

impl From<std::io::Error> for IpcError {
    fn from(err: std::io::Error) -> Self {
        IpcError::Io(err.to_string())
    }
}
