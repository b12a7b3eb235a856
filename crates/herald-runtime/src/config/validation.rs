//! Configuration validation utilities.

use std::collections::HashSet;

use herald_framework::find_handler;

use super::error::{ConfigError, ConfigResult};
use super::schema::{DistributedConfig, HeraldConfig, LogOutput, LoggingConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &HeraldConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_distributed_config(&config.distributed)?;
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    if logging.filters.keys().any(|module| module.trim().is_empty()) {
        return Err(ConfigError::validation(
            "Logging filter module names cannot be empty",
        ));
    }

    Ok(())
}

/// Every configured name must be unique and known to the handler catalog.
fn validate_distributed_config(distributed: &DistributedConfig) -> ConfigResult<()> {
    let mut seen = HashSet::new();

    for name in &distributed.handlers {
        if name.is_empty() {
            return Err(ConfigError::missing_field("distributed.handlers[]"));
        }
        if !seen.insert(name.as_str()) {
            return Err(ConfigError::DuplicateHandler(name.clone()));
        }
        if find_handler(name).is_none() {
            return Err(ConfigError::UnknownHandler(name.clone()));
        }
    }

    Ok(())
}
