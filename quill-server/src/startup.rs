//! Edge startup and shutdown.
//!
//! The edge spawns the core child, completes the startup handshake before
//! binding the HTTP listener, and on shutdown stops accepting, sends
//! SYSKILL, joins the correlator reader, and waits (briefly) for the child
//! to exit.

use std::ffi::OsString;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use quill_config::QuillConfig;
use quill_edge::app::{create_app, AppConfig};
use quill_edge::{Correlator, EdgeState};
use quill_ipc::{handshake, ChannelReader, ChannelWriter, TaskKind};

/// Grace period for the reader and the child during shutdown.
const STOP_GRACE: Duration = Duration::from_secs(2);

pub struct Server {
    config: QuillConfig,
    core_args: Vec<OsString>,
}

impl Server {
    pub fn new(config: QuillConfig, core_args: Vec<OsString>) -> Self {
        Self { config, core_args }
    }

    pub async fn start(self) -> Result<()> {
        let addr = self.config.server.socket_addr()?;

        let (child, correlator, reader_handle) = self.spawn_core().await?;
        info!("core is up, handshake complete");

        let state = EdgeState {
            correlator: correlator.clone(),
        };
        let app = create_app(
            state,
            AppConfig {
                enable_tracing: self.config.server.enable_tracing,
            },
        );

        info!(%addr, "edge listening");
        axum::Server::bind(&addr)
            .serve(app.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("http server failed")?;

        self.stop(child, correlator, reader_handle).await
    }

    /// Spawn this executable as the core child with piped stdio: the
    /// child's stdin is the request channel, its stdout the response
    /// channel. Handshake failure here is a fatal startup error.
    async fn spawn_core(&self) -> Result<(Child, Arc<Correlator>, JoinHandle<()>)> {
        let current_exe = std::env::current_exe().context("failed to resolve current exe")?;

        let mut cmd = Command::new(&current_exe);
        cmd.arg("--core")
            .args(&self.core_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut child = cmd.spawn().context("failed to spawn core process")?;
        info!(pid = ?child.id(), "core spawned");

        let stdin = child.stdin.take().context("core stdin unavailable")?;
        let stdout = child.stdout.take().context("core stdout unavailable")?;

        let mut writer = ChannelWriter::boxed(stdin);
        let mut reader = ChannelReader::boxed(stdout);

        handshake::edge_handshake(&mut writer, &mut reader, self.config.core.startup_window())
            .await
            .context("core handshake failed")?;

        let correlator = Correlator::new(writer, self.config.server.reply_timeout());
        let reader_handle = correlator.spawn_reader(reader);
        Ok((child, correlator, reader_handle))
    }

    /// Teardown order matters: in-flight HTTP handlers have already drained
    /// (graceful shutdown), so SYSKILL, then the reader, then the child.
    async fn stop(
        &self,
        mut child: Child,
        correlator: Arc<Correlator>,
        reader_handle: JoinHandle<()>,
    ) -> Result<()> {
        info!("sending SYSKILL to core");
        if correlator.send_control(TaskKind::Syskill).await.is_err() {
            warn!("SYSKILL send failed; core may already be gone");
        }

        // The core closes the response channel once drained; the reader
        // exits on that.
        if tokio::time::timeout(STOP_GRACE, reader_handle).await.is_err() {
            warn!("correlator reader did not stop in time");
        }

        match tokio::time::timeout(STOP_GRACE, child.wait()).await {
            Ok(Ok(status)) => info!(%status, "core exited"),
            Ok(Err(e)) => warn!(error = %e, "failed to reap core"),
            Err(_) => {
                warn!("core did not exit within grace period, killing");
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "failed to kill core");
                }
            }
        }

        info!("shutdown complete");
        Ok(())
    }
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received, draining");
}
