//! Per-domain validation support

use crate::error::{ConfigError, ConfigResult};

/// Implemented by each config domain so the loader can validate everything
/// after overrides are applied.
pub trait Validatable {
    fn validate(&self) -> ConfigResult<()>;

    fn domain_name(&self) -> &'static str;

    fn validation_error(&self, message: impl Into<String>) -> ConfigError {
        ConfigError::Validation {
            domain: self.domain_name().to_string(),
            message: message.into(),
        }
    }
}

pub fn validate_non_zero(value: u64, field: &str, domain: &str) -> ConfigResult<()> {
    if value == 0 {
        return Err(ConfigError::Validation {
            domain: domain.to_string(),
            message: format!("{} must be greater than 0", field),
        });
    }
    Ok(())
}
