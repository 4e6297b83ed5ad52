//! Core-process entry: run the dispatcher and worker pool over stdio.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use quill_config::QuillConfig;
use quill_core::{run_core, FsStorage};
use quill_ipc::{ChannelReader, ChannelWriter};

pub async fn run(config: &QuillConfig) -> Result<()> {
    info!(
        workers = config.core.workers,
        data_dir = %config.storage.data_dir.display(),
        "core starting"
    );

    let storage = FsStorage::open(config.storage.data_dir.clone())
        .await
        .context("failed to open storage")?;

    let reader = ChannelReader::boxed(tokio::io::stdin());
    let writer = ChannelWriter::boxed(tokio::io::stdout());

    run_core(reader, writer, &config.core, Arc::new(storage))
        .await
        .context("core failed")?;

    info!("core exited cleanly");
    Ok(())
}
