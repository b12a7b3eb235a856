//! Configuration errors.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested file does not exist.
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// Figment could not extract a `HeraldConfig` from the merged sources.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {message}")]
    ValidationError { message: String },

    /// A value needed by another setting is absent, e.g. `logging.file_path`
    /// with file output.
    #[error("Missing required configuration field: {field}")]
    MissingField { field: String },

    /// A configured handler name has no entry in the handler catalog.
    #[error("Unknown handler `{0}`: no #[register_handler] type has this name")]
    UnknownHandler(String),

    #[error("Handler `{0}` is listed more than once")]
    DuplicateHandler(String),
}

impl ConfigError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
