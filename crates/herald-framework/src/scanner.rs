//! Auto-registration of handler types.
//!
//! Each [`HandlerType`] in a list is expanded into one
//! [`RegistrationDescriptor`] per declared event type, and every descriptor is
//! subscribed as an [`IocHandlerFactory`], so the handler is resolved from the
//! container only when an event of that type is published.

use std::sync::Arc;

use herald_core::{EventTypeId, Subscriber, SubscriptionId};
use tracing::{debug, warn};

use crate::bus::EventBus;
use crate::handler_type::{HandlerType, HandlerTypeList};
use crate::resolver::{HandlerResolver, IocHandlerFactory};

/// One (event type, handler type) pair derived from a declaration.
#[derive(Debug, Clone)]
pub struct RegistrationDescriptor {
    /// The handled event type.
    pub event_type: EventTypeId,
    /// The handler type to resolve.
    pub handler: HandlerType,
}

/// A subscription created by [`scan_and_register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    /// Name of the handler type.
    pub handler: &'static str,
    /// The event type it was registered under.
    pub event_type: EventTypeId,
    /// The created subscription.
    pub subscription: SubscriptionId,
}

/// Outcome of a scan.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Subscriptions created, in registration order.
    pub registered: Vec<Registration>,
    /// Handler types that declared no handled event.
    pub skipped: Vec<&'static str>,
}

impl ScanReport {
    /// Returns the event types `handler` was registered under.
    pub fn event_types_of(&self, handler: &str) -> Vec<EventTypeId> {
        self.registered
            .iter()
            .filter(|r| r.handler == handler)
            .map(|r| r.event_type)
            .collect()
    }

    /// Returns `true` if nothing was registered or skipped.
    pub fn is_empty(&self) -> bool {
        self.registered.is_empty() && self.skipped.is_empty()
    }
}

/// Expands a handler type into its registration descriptors.
pub fn describe(handler: &HandlerType) -> Vec<RegistrationDescriptor> {
    handler
        .event_types()
        .map(|event_type| RegistrationDescriptor {
            event_type,
            handler: handler.clone(),
        })
        .collect()
}

/// Subscribes every handler type in `handlers` to `bus` under each event type
/// it declares.
///
/// Handler types declaring no event are skipped with a warning.
pub fn scan_and_register<B>(
    handlers: &HandlerTypeList,
    bus: &B,
    resolver: &HandlerResolver,
) -> ScanReport
where
    B: EventBus + ?Sized,
{
    let mut report = ScanReport::default();

    for handler in handlers {
        let descriptors = describe(handler);
        if descriptors.is_empty() {
            warn!(
                handler = handler.name(),
                "Handler type declares no handled events, skipping"
            );
            report.skipped.push(handler.name());
            continue;
        }

        for RegistrationDescriptor {
            event_type,
            handler,
        } in descriptors
        {
            let name = handler.name();
            let factory = Arc::new(IocHandlerFactory::new(resolver.clone(), handler));
            let subscription = bus.subscribe(event_type, Subscriber::factory(factory)).id();
            debug!(handler = name, event = %event_type, "Auto-registered");
            report.registered.push(Registration {
                handler: name,
                event_type,
                subscription,
            });
        }
    }

    report
}
