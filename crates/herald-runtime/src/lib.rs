//! Herald Runtime - configuration and bootstrap for the Herald event bus.
//!
//! This crate provides:
//! - Layered configuration loading (`ConfigLoader`, `HeraldConfig`)
//! - Logging setup (`LoggingBuilder`)
//! - `HeraldRuntime`, which builds the local and distributed buses and
//!   registers the configured handler types
//!
//! # Selecting handlers by name
//!
//! Handler types marked `#[register_handler]` are listed in a link-time
//! catalog and can be enabled from `herald.toml`:
//!
//! ```toml
//! [distributed]
//! handlers = ["notify-on-order-created"]
//! ```
//!
//! ```ignore
//! use herald_runtime::HeraldRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = HeraldRuntime::builder().build()?;
//!     runtime.distributed().publish(OrderCreated { order_id: 1 }).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

// Re-exports
pub use config::{ConfigError, ConfigLoader, ConfigResult, HeraldConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{HeraldRuntime, RuntimeBuilder};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros, for applications that log next to their handlers.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
