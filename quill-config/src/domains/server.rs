//! Edge server configuration

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigResult;
use crate::validation::{validate_non_zero, Validatable};

/// Settings for the HTTP edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    pub bind_address: String,

    /// How long an HTTP handler waits for its reply from the Core before
    /// answering 504.
    pub reply_timeout_ms: u64,

    /// Enable tower-http request tracing.
    pub enable_tracing: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            reply_timeout_ms: 5_000,
            enable_tracing: true,
        }
    }
}

impl ServerConfig {
    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }

    pub fn socket_addr(&self) -> ConfigResult<SocketAddr> {
        self.bind_address
            .parse()
            .map_err(|e| self.validation_error(format!("bad bind_address: {}", e)))
    }
}

impl Validatable for ServerConfig {
    fn validate(&self) -> ConfigResult<()> {
        self.socket_addr()?;
        validate_non_zero(self.reply_timeout_ms, "reply_timeout_ms", self.domain_name())
    }

    fn domain_name(&self) -> &'static str {
        "server"
    }
}
