//! The distributed face of the bus.
//!
//! Without a transport, integration events are delivered in process:
//! [`LocalDistributedBus`] forwards every operation unchanged to a
//! [`LocalEventBus`]. Its one extra duty happens at construction, where the
//! configured handler types are auto-registered.

use std::sync::Arc;

use async_trait::async_trait;
use herald_core::{
    BoxedEvent, EventTypeId, HandlerKey, PublishResult, Removal, Subscriber, SubscriptionHandle,
};
use tracing::info;

use crate::bus::{DistributedEventBus, EventBus, LocalEventBus};
use crate::container::HandlerContainer;
use crate::handler_type::{DeclaresHandlers, HandlerType, HandlerTypeList};
use crate::resolver::HandlerResolver;
use crate::scanner::{ScanReport, scan_and_register};

/// Options for [`LocalDistributedBus`].
#[derive(Clone, Debug, Default)]
pub struct DistributedBusOptions {
    /// Handler types registered when the bus is built.
    pub handlers: HandlerTypeList,
}

impl DistributedBusOptions {
    /// Creates empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a self-declaring handler type.
    pub fn handler<H: DeclaresHandlers>(mut self) -> Self {
        self.handlers.add::<H>();
        self
    }

    /// Adds an explicitly declared handler type.
    pub fn handler_type(mut self, handler: impl Into<HandlerType>) -> Self {
        self.handlers.push(handler);
        self
    }
}

/// Distributed bus delivering through a local bus.
#[derive(Clone)]
pub struct LocalDistributedBus {
    local: Arc<dyn LocalEventBus>,
    report: Arc<ScanReport>,
}

impl LocalDistributedBus {
    /// Wraps `local` and registers every handler type in `options`, resolving
    /// them through `container` at dispatch time.
    pub fn new(
        local: Arc<dyn LocalEventBus>,
        container: Arc<dyn HandlerContainer>,
        options: &DistributedBusOptions,
    ) -> Self {
        let resolver = HandlerResolver::new(container);
        let report = scan_and_register(&options.handlers, local.as_ref(), &resolver);
        info!(
            handler_types = options.handlers.len(),
            subscriptions = report.registered.len(),
            skipped = report.skipped.len(),
            "Distributed bus ready"
        );
        Self {
            local,
            report: Arc::new(report),
        }
    }

    /// Returns the bus every call is forwarded to.
    pub fn local(&self) -> &Arc<dyn LocalEventBus> {
        &self.local
    }

    /// Returns what the construction-time scan registered and skipped.
    pub fn scan_report(&self) -> &ScanReport {
        &self.report
    }
}

#[async_trait]
impl EventBus for LocalDistributedBus {
    fn subscribe(&self, event_type: EventTypeId, subscriber: Subscriber) -> SubscriptionHandle {
        self.local.subscribe(event_type, subscriber)
    }

    fn unsubscribe(&self, event_type: EventTypeId, key: HandlerKey) -> bool {
        self.local.unsubscribe(event_type, key)
    }

    fn unsubscribe_with(
        &self,
        event_type: EventTypeId,
        key: HandlerKey,
        removal: Removal,
    ) -> usize {
        self.local.unsubscribe_with(event_type, key, removal)
    }

    fn unsubscribe_all(&self, event_type: EventTypeId) -> usize {
        self.local.unsubscribe_all(event_type)
    }

    fn has_subscribers(&self, event_type: EventTypeId) -> bool {
        self.local.has_subscribers(event_type)
    }

    async fn publish_as(&self, event_type: EventTypeId, event: BoxedEvent) -> PublishResult {
        self.local.publish_as(event_type, event).await
    }

    async fn publish_hierarchy_boxed(&self, event: BoxedEvent) -> PublishResult {
        self.local.publish_hierarchy_boxed(event).await
    }
}

impl DistributedEventBus for LocalDistributedBus {}

impl std::fmt::Debug for LocalDistributedBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalDistributedBus")
            .field("registered", &self.report.registered.len())
            .field("skipped", &self.report.skipped)
            .finish()
    }
}
