//! Core process configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigResult;
use crate::validation::{validate_non_zero, Validatable};

/// Settings for the worker-pool half.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Number of worker tasks. The task queue's capacity equals this, so
    /// total concurrency is bounded at twice the worker count.
    pub workers: usize,

    /// Startup window for the PING handshake, both sides.
    pub startup_window_ms: u64,

    /// Whether LOG_OUT drops the session server-side. When false, logout
    /// answers 200 without touching the session table.
    pub invalidate_sessions_on_logout: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            startup_window_ms: 5_000,
            invalidate_sessions_on_logout: true,
        }
    }
}

impl CoreConfig {
    pub fn startup_window(&self) -> Duration {
        Duration::from_millis(self.startup_window_ms)
    }
}

impl Validatable for CoreConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_non_zero(self.workers as u64, "workers", self.domain_name())?;
        validate_non_zero(self.startup_window_ms, "startup_window_ms", self.domain_name())
    }

    fn domain_name(&self) -> &'static str {
        "core"
    }
}
