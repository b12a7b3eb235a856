//! The in-process bus.

use std::sync::Arc;

use async_trait::async_trait;
use herald_core::{
    BoxedEvent, Dispatcher, EventTypeId, HandlerKey, PublishResult, Removal, Subscriber,
    SubscriptionHandle, SubscriptionRegistry,
};

use crate::bus::{EventBus, LocalEventBus};

/// The local face of the bus.
///
/// Cloning is cheap; clones share the same registry.
#[derive(Clone, Debug)]
pub struct LocalBus {
    registry: Arc<SubscriptionRegistry>,
    dispatcher: Dispatcher,
}

impl LocalBus {
    /// Creates a bus with its own empty registry.
    pub fn new() -> Self {
        Self::with_registry(Arc::new(SubscriptionRegistry::new()))
    }

    /// Creates a bus over an existing registry.
    pub fn with_registry(registry: Arc<SubscriptionRegistry>) -> Self {
        Self {
            dispatcher: Dispatcher::new(Arc::clone(&registry)),
            registry,
        }
    }

    /// Returns the registry.
    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for LocalBus {
    fn subscribe(&self, event_type: EventTypeId, subscriber: Subscriber) -> SubscriptionHandle {
        self.registry.subscribe(event_type, subscriber)
    }

    fn unsubscribe(&self, event_type: EventTypeId, key: HandlerKey) -> bool {
        self.registry.unsubscribe(event_type, key, Removal::First) > 0
    }

    fn unsubscribe_with(
        &self,
        event_type: EventTypeId,
        key: HandlerKey,
        removal: Removal,
    ) -> usize {
        self.registry.unsubscribe(event_type, key, removal)
    }

    fn unsubscribe_all(&self, event_type: EventTypeId) -> usize {
        self.registry.unsubscribe_all(event_type)
    }

    fn has_subscribers(&self, event_type: EventTypeId) -> bool {
        self.registry.handler_count(event_type) > 0
    }

    async fn publish_as(&self, event_type: EventTypeId, event: BoxedEvent) -> PublishResult {
        self.dispatcher.publish(event_type, &event).await
    }

    async fn publish_hierarchy_boxed(&self, event: BoxedEvent) -> PublishResult {
        self.dispatcher.publish_hierarchy(&event).await
    }
}

impl LocalEventBus for LocalBus {}
