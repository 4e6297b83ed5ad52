//! Quill server binary.
//!
//! One executable, two roles: by default it runs the HTTP edge, which
//! spawns this same executable with `--core` as a child process and talks
//! to it over the child's piped stdio. SIGINT/SIGTERM on the edge drives
//! the whole pair down cleanly.

mod core_process;
mod logging;
mod startup;

use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use quill_config::ConfigLoader;

#[derive(Parser)]
#[command(author, version, about = "Collaborative note server", long_about = None)]
struct Cli {
    /// Configuration file path (YAML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// HTTP bind address override
    #[arg(long)]
    bind: Option<String>,

    /// Worker count override
    #[arg(long)]
    workers: Option<usize>,

    /// Data directory override
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Run as the core process over stdio. Spawned by the edge, not meant
    /// to be used directly.
    #[arg(long, hide = true)]
    core: bool,
}

impl Cli {
    /// Arguments the edge forwards to the core child so both halves resolve
    /// the same configuration.
    fn forwarded_args(&self) -> Vec<OsString> {
        let mut args = Vec::new();
        if let Some(config) = &self.config {
            args.push("--config".into());
            args.push(config.clone().into_os_string());
        }
        if let Some(workers) = self.workers {
            args.push("--workers".into());
            args.push(workers.to_string().into());
        }
        if let Some(data_dir) = &self.data_dir {
            args.push("--data-dir".into());
            args.push(data_dir.clone().into_os_string());
        }
        args
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ConfigLoader::new()
        .load(cli.config.as_ref())
        .context("failed to load configuration")?;

    if let Some(bind) = &cli.bind {
        config.server.bind_address = bind.clone();
    }
    if let Some(workers) = cli.workers {
        config.core.workers = workers;
    }
    if let Some(data_dir) = &cli.data_dir {
        config.storage.data_dir = data_dir.clone();
    }
    config.validate_all().context("invalid configuration")?;

    if cli.core {
        // The core's stdout is the response channel; logs go to stderr.
        logging::init(&config.logging, true);
        core_process::run(&config).await
    } else {
        logging::init(&config.logging, false);
        startup::Server::new(config, cli.forwarded_args()).start().await
    }
}
