//! # Herald
//!
//! A typed, in-process event bus. Publishers and subscribers share nothing
//! but the event type.
//!
//! ## Architecture
//!
//! ```text
//!                   ┌────────────────────┐
//!  publish ────────▶│ LocalDistributedBus│── forwards ──┐
//!                   └────────────────────┘              ▼
//!  publish ────────────────────────────────────▶┌──────────────┐   snapshot   ┌────────────┐
//!                                               │   LocalBus   │─────────────▶│ Dispatcher │
//!                                               └──────┬───────┘              └─────┬──────┘
//!                                                      │ subscribe                  │ in order
//!                                                      ▼                            ▼
//!                                               ┌──────────────┐     callback / instance / factory
//!                                               │   Registry   │                    │
//!                                               └──────────────┘                    ▼
//!                                                                       HandlerScope (resolve, release)
//! ```
//!
//! - **Registry**: ordered subscription lists per event type, copy-on-write
//! - **Dispatcher**: sequential delivery, every failure collected into one
//!   `DispatchError`
//! - **Factories**: resolve a handler from a container scope for one dispatch
//!   and release the scope afterwards
//! - **Distributed bus**: the local bus plus auto-registration of the
//!   configured handler types
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use herald::prelude::*;
//!
//! #[derive(Clone, Event)]
//! #[event(name = "order.created")]
//! pub struct OrderCreated {
//!     pub order_id: u64,
//! }
//!
//! #[register_handler(OrderCreated, constructible, name = "notify")]
//! #[derive(Default)]
//! pub struct NotifyOnOrderCreated;
//!
//! #[async_trait]
//! impl EventHandler<OrderCreated> for NotifyOnOrderCreated {
//!     async fn handle_event(&self, event: &OrderCreated) -> anyhow::Result<()> {
//!         info!(order = event.order_id, "Order created");
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = HeraldRuntime::builder().handler::<NotifyOnOrderCreated>().build()?;
//!     runtime.distributed().publish(OrderCreated { order_id: 1 }).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `macros` *(default)*: `#[derive(Event)]` and `#[register_handler]`
//! - `toml-config` *(default)* / `yaml-config`: configuration file formats
//! - `json-log`: JSON log output
//!
//! Code generated by the macros refers to `herald_core` and
//! `herald_framework`, so crates using them depend on both directly.

pub use herald_core as core;
pub use herald_framework as framework;
pub use herald_runtime as runtime;

#[cfg(feature = "macros")]
pub use herald_macros::{Event, register_handler};

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use herald::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use herald_runtime::{HeraldConfig, HeraldRuntime};

    // Events and handlers
    pub use herald_core::{
        BoxedEvent, Callback, DispatchError, Event, EventHandler, EventTypeId, HandlerFactory,
        PublishResult, Removal, SubscriptionHandle, async_trait,
    };

    // Buses
    pub use herald_framework::{
        DistributedEventBus, EventBus, EventBusExt, LocalBus, LocalDistributedBus, LocalEventBus,
    };

    // Handler declarations and containers
    pub use herald_framework::{
        DeclaresHandlers, HandlerContainer, HandlerType, HandlerTypeList, ServiceContainer,
    };

    #[cfg(feature = "macros")]
    pub use herald_macros::{Event, register_handler};

    // Logging
    pub use herald_runtime::prelude::*;
}
