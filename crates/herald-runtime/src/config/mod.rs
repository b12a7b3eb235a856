//! Configuration for the Herald runtime.
//!
//! Loading is layered with figment (defaults, config files, `HERALD_*`
//! environment variables, programmatic merges) and the result is checked
//! against the handler catalog before the runtime uses it.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    DistributedConfig, HeraldConfig, LogFormat, LogLevel, LogOutput, LoggingConfig,
    SpanEventConfig,
};
pub use validation::validate_config;
