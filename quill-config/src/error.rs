//! Configuration error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("environment override error: {0}")]
    Env(String),

    #[error("invalid {domain} config: {message}")]
    Validation { domain: String, message: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;
