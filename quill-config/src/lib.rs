//! Configuration for the quill server.
//!
//! Configuration is split by domain (server, core, storage, logging), loads
//! from a YAML file, and accepts `QUILL_*` environment overrides on top.

pub mod domains;
pub mod error;
pub mod loader;
pub mod validation;

pub use domains::{CoreConfig, LogFormat, LoggingConfig, QuillConfig, ServerConfig, StorageConfig};
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
