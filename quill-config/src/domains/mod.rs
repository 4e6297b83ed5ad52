//! Configuration domains

pub mod core;
pub mod logging;
pub mod server;
pub mod storage;

pub use self::core::CoreConfig;
pub use self::logging::{LogFormat, LogLevel, LoggingConfig};
pub use self::server::ServerConfig;
pub use self::storage::StorageConfig;

use serde::{Deserialize, Serialize};

use crate::error::ConfigResult;
use crate::validation::Validatable;

/// Root configuration for both halves of the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuillConfig {
    pub server: ServerConfig,
    pub core: CoreConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

impl QuillConfig {
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.server.validate()?;
        self.core.validate()?;
        self.storage.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}
