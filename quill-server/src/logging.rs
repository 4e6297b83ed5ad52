//! Tracing setup.

use tracing_subscriber::EnvFilter;

use quill_config::{LogFormat, LoggingConfig};

/// Initialize the global subscriber from config. `RUST_LOG` wins when set.
/// `to_stderr` is used by the core process, whose stdout carries the
/// response channel.
pub fn init(config: &LoggingConfig, to_stderr: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_filter()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    // try_init so tests that initialize twice don't panic.
    let result = match (config.format, to_stderr) {
        (LogFormat::Json, true) => builder.json().with_writer(std::io::stderr).try_init(),
        (LogFormat::Json, false) => builder.json().try_init(),
        (LogFormat::Compact, true) => builder.compact().with_writer(std::io::stderr).try_init(),
        (LogFormat::Compact, false) => builder.compact().try_init(),
        (LogFormat::Text, true) => builder.with_writer(std::io::stderr).try_init(),
        (LogFormat::Text, false) => builder.try_init(),
    };
    if result.is_err() {
        tracing::debug!("tracing subscriber already initialized");
    }
}
