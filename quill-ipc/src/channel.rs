//! Channel endpoints.
//!
//! A channel is a unidirectional, ordered, reliable stream of framed task
//! records with exactly one reader and one writer. Production channels ride
//! on the Core child's piped stdin/stdout; tests use an in-process duplex
//! pair. Nothing here cares which, so the endpoints are generic over the
//! stream type and usually used through the boxed [`TaskReader`] /
//! [`TaskWriter`] aliases.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader, DuplexStream};

use crate::error::IpcError;
use crate::frame::{read_frame, write_frame};
use crate::task::TaskRecord;

/// Boxed stream halves, so channel users don't carry stream type parameters.
pub type BoxedRead = Box<dyn AsyncRead + Send + Unpin>;
pub type BoxedWrite = Box<dyn AsyncWrite + Send + Unpin>;

pub type TaskReader = ChannelReader<BoxedRead>;
pub type TaskWriter = ChannelWriter<BoxedWrite>;

/// The consuming end of a channel.
pub struct ChannelReader<R> {
    inner: BufReader<R>,
}

impl<R: AsyncRead + Unpin> ChannelReader<R> {
    pub fn new(stream: R) -> Self {
        Self {
            inner: BufReader::new(stream),
        }
    }

    /// Block until a full record arrives.
    ///
    /// A clean EOF surfaces as [`IpcError::NoWriters`]; callers treat it as
    /// "the peer is gone".
    pub async fn read(&mut self) -> Result<TaskRecord, IpcError> {
        read_frame(&mut self.inner).await
    }

    /// Like [`read`](Self::read), but gives up after `deadline`.
    ///
    /// Returns `Ok(None)` on timeout. The deadline covers only the wait for
    /// the first byte of the frame; since nothing has been consumed at that
    /// point, a timed-out channel remains usable.
    pub async fn read_with_deadline(
        &mut self,
        deadline: Duration,
    ) -> Result<Option<TaskRecord>, IpcError> {
        match tokio::time::timeout(deadline, self.inner.fill_buf()).await {
            Err(_) => Ok(None),
            Ok(Ok(buf)) if buf.is_empty() => Err(IpcError::NoWriters),
            Ok(Ok(_)) => self.read().await.map(Some),
            Ok(Err(e)) => Err(e.into()),
        }
    }
}

impl ChannelReader<BoxedRead> {
    /// Erase the stream type.
    pub fn boxed(stream: impl AsyncRead + Send + Unpin + 'static) -> TaskReader {
        ChannelReader::new(Box::new(stream))
    }
}

/// The producing end of a channel.
pub struct ChannelWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> ChannelWriter<W> {
    pub fn new(stream: W) -> Self {
        Self { inner: stream }
    }

    /// Write one record, blocking until the frame is fully flushed.
    pub async fn send(&mut self, task: &TaskRecord) -> Result<(), IpcError> {
        write_frame(&mut self.inner, task).await
    }
}

impl ChannelWriter<BoxedWrite> {
    /// Erase the stream type.
    pub fn boxed(stream: impl AsyncWrite + Send + Unpin + 'static) -> TaskWriter {
        ChannelWriter::new(Box::new(stream))
    }
}

/// An in-process unidirectional channel, for tests and co-located setups.
pub fn pair(capacity: usize) -> (ChannelWriter<DuplexStream>, ChannelReader<DuplexStream>) {
    let (write_side, read_side) = tokio::io::duplex(capacity);
    (ChannelWriter::new(write_side), ChannelReader::new(read_side))
}

/// Boxed variant of [`pair`].
pub fn boxed_pair(capacity: usize) -> (TaskWriter, TaskReader) {
    let (write_side, read_side) = tokio::io::duplex(capacity);
    (
        ChannelWriter::boxed(write_side),
        ChannelReader::boxed(read_side),
    )
}
