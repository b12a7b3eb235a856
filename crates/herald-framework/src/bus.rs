//! The event bus contract.
//!
//! [`EventBus`] is the object-safe surface shared by both facades; it works
//! with erased subscribers and payloads. [`EventBusExt`] layers the typed
//! convenience methods on top of any bus.
//!
//! [`LocalEventBus`] and [`DistributedEventBus`] are distinct contracts over
//! the same surface: code that only needs in-process delivery asks for the
//! former, code that publishes integration events asks for the latter.
//!
//! # Example
//!
//! ```rust,ignore
//! use herald_framework::{EventBusExt, LocalBus};
//!
//! let bus = LocalBus::new();
//! let handle = bus.subscribe_fn(|event: Arc<OrderCreated>| async move {
//!     tracing::info!(order = event.order_id, "created");
//!     Ok(())
//! });
//!
//! bus.publish(OrderCreated { order_id: 1 }).await?;
//! handle.dispose();
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use herald_core::{
    BoxedEvent, Callback, Event, EventHandler, EventTypeId, HandlerFactory, HandlerKey,
    PublishResult, Removal, Subscriber, SubscriptionHandle,
};

use crate::resolver::TransientHandlerFactory;

/// Subscribe, unsubscribe and publish against a subscription registry.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Registers `subscriber` for `event_type`.
    fn subscribe(&self, event_type: EventTypeId, subscriber: Subscriber) -> SubscriptionHandle;

    /// Removes the earliest entry for `event_type` matching `key`.
    ///
    /// Returns `false` if nothing matched.
    fn unsubscribe(&self, event_type: EventTypeId, key: HandlerKey) -> bool;

    /// Removes entries for `event_type` matching `key` according to `removal`.
    fn unsubscribe_with(&self, event_type: EventTypeId, key: HandlerKey, removal: Removal)
    -> usize;

    /// Removes every entry for `event_type`.
    fn unsubscribe_all(&self, event_type: EventTypeId) -> usize;

    /// Returns `true` if `event_type` has at least one entry.
    fn has_subscribers(&self, event_type: EventTypeId) -> bool;

    /// Publishes `event` to the entries registered under `event_type`.
    async fn publish_as(&self, event_type: EventTypeId, event: BoxedEvent) -> PublishResult;

    /// Publishes `event` under its own type and every ancestor type.
    async fn publish_hierarchy_boxed(&self, event: BoxedEvent) -> PublishResult;
}

/// An in-process event bus.
pub trait LocalEventBus: EventBus {}

/// An event bus intended for events that may cross process boundaries.
pub trait DistributedEventBus: EventBus {}

/// Typed convenience methods for every [`EventBus`].
pub trait EventBusExt: EventBus {
    /// Subscribes an async closure.
    fn subscribe_fn<E, F, Fut>(&self, f: F) -> SubscriptionHandle
    where
        E: Event,
        F: Fn(Arc<E>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.subscribe_callback(&Callback::new(f))
    }

    /// Subscribes a callback; keep it to unsubscribe later.
    fn subscribe_callback<E: Event>(&self, callback: &Callback<E>) -> SubscriptionHandle {
        self.subscribe(EventTypeId::of::<E>(), Subscriber::callback(callback))
    }

    /// Subscribes a shared handler instance.
    fn subscribe_handler<E, H>(&self, handler: &Arc<H>) -> SubscriptionHandle
    where
        E: Event,
        H: EventHandler<E>,
    {
        self.subscribe(
            EventTypeId::of::<E>(),
            Subscriber::instance::<E, H>(handler),
        )
    }

    /// Subscribes `H`, built with `Default` for every event and dropped after.
    fn subscribe_transient<E, H>(&self) -> SubscriptionHandle
    where
        E: Event,
        H: EventHandler<E> + Default,
    {
        self.subscribe(
            EventTypeId::of::<E>(),
            Subscriber::factory(Arc::new(TransientHandlerFactory::<E, H>::new())),
        )
    }

    /// Subscribes a handler factory.
    fn subscribe_factory<E: Event>(&self, factory: Arc<dyn HandlerFactory>) -> SubscriptionHandle {
        self.subscribe(EventTypeId::of::<E>(), Subscriber::factory(factory))
    }

    /// Removes the earliest subscription of `callback` (or a clone of it).
    fn unsubscribe_callback<E: Event>(&self, callback: &Callback<E>) -> bool {
        self.unsubscribe(EventTypeId::of::<E>(), HandlerKey::of_callback(callback))
    }

    /// Removes the earliest subscription of this handler instance.
    fn unsubscribe_handler<E, H>(&self, handler: &Arc<H>) -> bool
    where
        E: Event,
        H: EventHandler<E>,
    {
        self.unsubscribe(EventTypeId::of::<E>(), HandlerKey::of_instance(handler))
    }

    /// Removes the earliest subscription of `factory`, or of any factory for
    /// the same handler type.
    fn unsubscribe_factory<E: Event>(&self, factory: &Arc<dyn HandlerFactory>) -> bool {
        self.unsubscribe(EventTypeId::of::<E>(), HandlerKey::of_factory(factory))
    }

    /// Removes the earliest factory subscription producing `H`.
    fn unsubscribe_handler_type<E, H>(&self) -> bool
    where
        E: Event,
        H: 'static,
    {
        self.unsubscribe(EventTypeId::of::<E>(), HandlerKey::of_handler_type::<H>())
    }

    /// Removes every subscription for `E`.
    fn unsubscribe_all_of<E: Event>(&self) -> usize {
        self.unsubscribe_all(EventTypeId::of::<E>())
    }

    /// Publishes `event` under its own type.
    fn publish<E: Event>(&self, event: E) -> BoxFuture<'_, PublishResult> {
        self.publish_as(EventTypeId::of::<E>(), BoxedEvent::new(event))
    }

    /// Publishes `event` under its own type and then every ancestor type.
    fn publish_hierarchy<E: Event>(&self, event: E) -> BoxFuture<'_, PublishResult> {
        self.publish_hierarchy_boxed(BoxedEvent::new(event))
    }
}

impl<B: EventBus + ?Sized> EventBusExt for B {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalBus;
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StockLow {
        sku: &'static str,
    }

    impl Event for StockLow {
        fn event_name(&self) -> &'static str {
            "stock.low"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    static REORDERS: AtomicUsize = AtomicUsize::new(0);

    #[derive(Default)]
    struct Reorder;

    #[async_trait]
    impl EventHandler<StockLow> for Reorder {
        async fn handle_event(&self, event: &StockLow) -> anyhow::Result<()> {
            assert_eq!(event.sku, "widget");
            REORDERS.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn reorder_factory() -> Arc<dyn HandlerFactory> {
        Arc::new(TransientHandlerFactory::<StockLow, Reorder>::new())
    }

    #[tokio::test]
    async fn test_factory_helpers_through_trait_object() {
        let bus: Arc<dyn LocalEventBus> = Arc::new(LocalBus::new());
        let event_type = EventTypeId::of::<StockLow>();

        let _ = bus.subscribe_factory::<StockLow>(reorder_factory());
        assert!(bus.has_subscribers(event_type));

        let before = REORDERS.load(Ordering::SeqCst);
        bus.publish(StockLow { sku: "widget" }).await.unwrap();
        assert_eq!(REORDERS.load(Ordering::SeqCst), before + 1);

        // A different factory for the same handler type matches.
        assert!(bus.unsubscribe_factory::<StockLow>(&reorder_factory()));
        assert!(!bus.unsubscribe_factory::<StockLow>(&reorder_factory()));
        assert!(!bus.has_subscribers(event_type));
    }

    #[tokio::test]
    async fn test_typed_helpers_key_by_event_type() {
        let bus = LocalBus::new();
        let callback = Callback::new(|_: Arc<StockLow>| async { Ok(()) });

        let handle = bus.subscribe_callback(&callback);
        let _ = bus.subscribe_fn(|_: Arc<StockLow>| async { Ok(()) });
        assert_eq!(bus.registry().handler_count(EventTypeId::of::<StockLow>()), 2);

        assert!(handle.dispose());
        assert!(!bus.unsubscribe_callback(&callback));
        assert_eq!(bus.unsubscribe_all_of::<StockLow>(), 1);
        assert_eq!(bus.unsubscribe_all_of::<StockLow>(), 0);

        // Nothing subscribed: publishing succeeds with no handlers.
        bus.publish(StockLow { sku: "gadget" }).await.unwrap();
        bus.publish_hierarchy(StockLow { sku: "gadget" }).await.unwrap();
    }
}
