//! Startup handshake.
//!
//! Before either half serves traffic, the Edge writes a PING on the request
//! channel and the Core answers with a PING on the response channel. The
//! exchange proves both endpoints of both channels are open; until then
//! neither side starts its HTTP listener or workers. Failing to complete
//! the exchange within the startup window is a fatal startup error.

use std::time::Duration;

use serde_json::json;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use crate::channel::{ChannelReader, ChannelWriter};
use crate::error::IpcError;
use crate::task::{TaskKind, TaskRecord};

/// Correlation id used by handshake PINGs. Edge correlation ids start at 1,
/// so 0 can never collide with a live request.
pub const HANDSHAKE_CORRELATION_ID: u64 = 0;

/// Edge side: send PING, wait for the Core's PING reply.
pub async fn edge_handshake<W, R>(
    writer: &mut ChannelWriter<W>,
    reader: &mut ChannelReader<R>,
    window: Duration,
) -> Result<(), IpcError>
where
    W: AsyncWrite + Unpin,
    R: AsyncRead + Unpin,
{
    let ping = TaskRecord::new(TaskKind::Ping, HANDSHAKE_CORRELATION_ID, json!({}));
    writer.send(&ping).await?;
    debug!("handshake ping sent, waiting for core");

    match reader.read_with_deadline(window).await? {
        Some(reply) if reply.kind == TaskKind::Ping => {
            debug!("handshake complete");
            Ok(())
        }
        Some(reply) => Err(IpcError::Handshake(format!(
            "expected PING from core, got {:?}",
            reply.kind
        ))),
        None => Err(IpcError::Handshake(
            "core did not answer within the startup window".into(),
        )),
    }
}

/// Core side: wait for the Edge's PING, answer it.
pub async fn core_handshake<R, W>(
    reader: &mut ChannelReader<R>,
    writer: &mut ChannelWriter<W>,
    window: Duration,
) -> Result<(), IpcError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    match reader.read_with_deadline(window).await? {
        Some(ping) if ping.kind == TaskKind::Ping => {
            let reply = TaskRecord::reply(TaskKind::Ping, ping.correlation_id, json!({}));
            writer.send(&reply).await?;
            debug!("handshake pong sent");
            Ok(())
        }
        Some(other) => Err(IpcError::Handshake(format!(
            "expected PING from edge, got {:?}",
            other.kind
        ))),
        None => Err(IpcError::Handshake(
            "edge did not ping within the startup window".into(),
        )),
    }
}
