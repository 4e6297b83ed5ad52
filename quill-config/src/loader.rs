//! Configuration loading and environment overrides

use std::path::Path;
use std::str::FromStr;

use crate::domains::{LogFormat, LogLevel, QuillConfig};
use crate::error::{ConfigError, ConfigResult};

/// Loads YAML configuration and layers `PREFIX_*` environment variables on
/// top. The default prefix is `QUILL`.
pub struct ConfigLoader {
    prefix: String,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            prefix: "QUILL".to_string(),
        }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load from a YAML file, then apply environment overrides and validate.
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<QuillConfig> {
        let content = std::fs::read_to_string(path)?;
        let mut config: QuillConfig = serde_yaml::from_str(&content)?;
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Defaults plus environment overrides only.
    pub fn from_env(&self) -> ConfigResult<QuillConfig> {
        let mut config = QuillConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// File if given, environment otherwise.
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<QuillConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    fn apply_env_overrides(&self, config: &mut QuillConfig) -> ConfigResult<()> {
        if let Ok(bind) = self.get_env_var("SERVER_BIND_ADDRESS") {
            config.server.bind_address = bind;
        }

        if let Ok(timeout) = self.get_env_var("SERVER_REPLY_TIMEOUT_MS") {
            config.server.reply_timeout_ms = timeout
                .parse()
                .map_err(|e| ConfigError::Env(format!("invalid SERVER_REPLY_TIMEOUT_MS: {}", e)))?;
        }

        if let Ok(workers) = self.get_env_var("CORE_WORKERS") {
            config.core.workers = workers
                .parse()
                .map_err(|e| ConfigError::Env(format!("invalid CORE_WORKERS: {}", e)))?;
        }

        if let Ok(window) = self.get_env_var("CORE_STARTUP_WINDOW_MS") {
            config.core.startup_window_ms = window
                .parse()
                .map_err(|e| ConfigError::Env(format!("invalid CORE_STARTUP_WINDOW_MS: {}", e)))?;
        }

        if let Ok(flag) = self.get_env_var("CORE_INVALIDATE_SESSIONS_ON_LOGOUT") {
            config.core.invalidate_sessions_on_logout = flag.parse().map_err(|e| {
                ConfigError::Env(format!("invalid CORE_INVALIDATE_SESSIONS_ON_LOGOUT: {}", e))
            })?;
        }

        if let Ok(dir) = self.get_env_var("STORAGE_DATA_DIR") {
            config.storage.data_dir = dir.into();
        }

        if let Ok(level) = self.get_env_var("LOG_LEVEL") {
            config.logging.level = LogLevel::from_str(&level)
                .map_err(|_| ConfigError::Env(format!("invalid LOG_LEVEL: {}", level)))?;
        }

        if let Ok(format) = self.get_env_var("LOG_FORMAT") {
            config.logging.format = LogFormat::from_str(&format)
                .map_err(|_| ConfigError::Env(format!("invalid LOG_FORMAT: {}", format)))?;
        }

        Ok(())
    }

    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
