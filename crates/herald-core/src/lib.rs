//! # Herald Core
//!
//! The subscription registry and dispatch engine of the Herald event bus.
//!
//! ## Architecture Layers
//!
//! ### Foundation Layer
//!
//! - **Event Model**: type-erased payloads with runtime downcasting
//!   ([`Event`], [`BoxedEvent`], [`EventTypeId`])
//! - **Errors**: resolution, invocation and aggregate dispatch failures
//!   ([`ResolveError`], [`HandlerFailure`], [`DispatchError`])
//!
//! ### Framework Layer
//!
//! - **Handlers**: callbacks, handler instances and handler factories
//!   ([`Callback`], [`EventHandler`], [`HandlerFactory`])
//! - **Registry**: ordered, copy-on-write subscription lists
//!   ([`SubscriptionRegistry`])
//! - **Dispatcher**: sequential delivery with failure aggregation
//!   ([`Dispatcher`])
//!
//! ```text
//! ┌────────────┐  subscribe   ┌──────────────┐  snapshot  ┌────────────┐
//! │   Caller   │─────────────▶│   Registry   │◀───────────│ Dispatcher │
//! └────────────┘              └──────────────┘            └─────┬──────┘
//!                                                               │ in order
//!                                              ┌────────────────┼──────────┐
//!                                              ▼                ▼          ▼
//!                                          Callback         Instance    Factory
//! ```

pub mod foundation;
pub mod framework;

pub use foundation::{
    Ancestors, BoxedEvent, DispatchError, Event, EventTypeId, HandlerFailure, PayloadMismatch,
    PublishResult, ResolveError, ResolveResult, short_type_name,
};

pub use framework::{
    BoxFuture, Callback, Dispatcher, EntrySnapshot, ErasedCallback, ErasedHandler, EventHandler,
    FactoryKey, HandlerFactory, HandlerKey, HandlerLease, Removal, Subscriber, SubscriberKind,
    SubscriptionEntry, SubscriptionGuard, SubscriptionHandle, SubscriptionId,
    SubscriptionRegistry, erase_handler,
};

// Used by code generated from `herald-macros`.
#[doc(hidden)]
pub use async_trait::async_trait;

/// Prelude for common imports.
pub mod prelude {
    pub use super::foundation::{BoxedEvent, DispatchError, Event, EventTypeId, PublishResult};
    pub use super::framework::{
        Callback, EventHandler, HandlerFactory, HandlerLease, Removal, SubscriptionHandle,
    };
}
