//! Wire framing for task records.
//!
//! Every record travels as a fixed 28-byte header followed by a
//! length-prefixed UTF-8 JSON payload:
//!
//! ```text
//! offset  size  field
//!      0     8  kind tag        (LE u64)
//!      8     8  correlation id  (LE u64)
//!     16     8  worker id       (LE u64)
//!     24     4  payload length  (LE u32)
//!     28     n  payload         (UTF-8 JSON)
//! ```
//!
//! The layout is explicit; there is no padding. The format is point-to-point
//! and process-local; both peers come from the same build, so no version
//! negotiation is carried. A reader yields a complete record or an error;
//! half-records are never exposed upstream.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::IpcError;
use crate::task::{TaskKind, TaskRecord};

/// Header size in bytes.
pub const HEADER_LEN: usize = 28;

/// Upper bound on the payload length word. Guards against interpreting a
/// corrupt header as a multi-gigabyte allocation.
pub const MAX_PAYLOAD_LEN: u32 = 16 * 1024 * 1024;

/// Write one framed record and flush it.
pub async fn write_frame<W>(writer: &mut W, task: &TaskRecord) -> Result<(), IpcError>
where
    W: AsyncWrite + Unpin,
{
    let payload =
        serde_json::to_vec(&task.payload).map_err(|e| IpcError::Serialization(e.to_string()))?;
    if payload.len() > MAX_PAYLOAD_LEN as usize {
        return Err(IpcError::PayloadTooLarge(payload.len() as u32));
    }

    let mut header = [0u8; HEADER_LEN];
    header[0..8].copy_from_slice(&task.kind.wire_tag().to_le_bytes());
    header[8..16].copy_from_slice(&task.correlation_id.to_le_bytes());
    header[16..24].copy_from_slice(&task.worker_id.to_le_bytes());
    header[24..28].copy_from_slice(&(payload.len() as u32).to_le_bytes());

    writer.write_all(&header).await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one framed record.
///
/// EOF before the first header byte is [`IpcError::NoWriters`]; EOF anywhere
/// else is [`IpcError::Truncated`]. An unknown kind tag or malformed JSON
/// still consumes the whole frame, so the stream stays aligned and the
/// caller may keep reading.
pub async fn read_frame<R>(reader: &mut R) -> Result<TaskRecord, IpcError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    fill_buf_exact(reader, &mut header, true).await?;

    let kind_tag = read_u64_le(&header[0..8]);
    let correlation_id = read_u64_le(&header[8..16]);
    let worker_id = read_u64_le(&header[16..24]);
    let payload_len = {
        let mut word = [0u8; 4];
        word.copy_from_slice(&header[24..28]);
        u32::from_le_bytes(word)
    };

    if payload_len > MAX_PAYLOAD_LEN {
        return Err(IpcError::PayloadTooLarge(payload_len));
    }

    let mut payload = vec![0u8; payload_len as usize];
    fill_buf_exact(reader, &mut payload, false).await?;

    // Consume the payload before validating the tag so one bad frame does
    // not desynchronize the stream.
    let kind = TaskKind::from_wire_tag(kind_tag)?;
    let payload =
        serde_json::from_slice(&payload).map_err(|e| IpcError::Deserialization(e.to_string()))?;

    Ok(TaskRecord {
        kind,
        correlation_id,
        worker_id,
        payload,
        progress: 0,
        done: false,
    })
}

fn read_u64_le(slice: &[u8]) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(slice);
    u64::from_le_bytes(word)
}

/// Read exactly `buf.len()` bytes, distinguishing EOF-at-boundary from
/// EOF-mid-frame.
async fn fill_buf_exact<R>(
    reader: &mut R,
    buf: &mut [u8],
    at_frame_start: bool,
) -> Result<(), IpcError>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            return if at_frame_start && filled == 0 {
                Err(IpcError::NoWriters)
            } else {
                Err(IpcError::Truncated)
            };
        }
        filled += n;
    }
    Ok(())
}
