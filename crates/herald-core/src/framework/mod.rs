//! Framework layer: handlers, subscriptions, the registry and the dispatcher.
//!
//! - Handler traits and the callback/instance/factory shapes
//! - Subscription entries, identities and disposable handles
//! - The copy-on-write subscription registry
//! - The sequential, continue-and-aggregate dispatcher

pub mod dispatcher;
pub mod handler;
pub mod registry;
pub mod subscription;

pub use dispatcher::Dispatcher;
pub use handler::{
    BoxFuture, Callback, ErasedCallback, ErasedHandler, EventHandler, HandlerFactory,
    HandlerLease, erase_handler,
};
pub use registry::{EntrySnapshot, SubscriptionRegistry};
pub use subscription::{
    FactoryKey, HandlerKey, Removal, Subscriber, SubscriberKind, SubscriptionEntry,
    SubscriptionGuard, SubscriptionHandle, SubscriptionId,
};
