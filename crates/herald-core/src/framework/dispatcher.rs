//! Event dispatcher for the Herald bus.
//!
//! The [`Dispatcher`] takes a snapshot of the entries registered for an event
//! type and invokes them one after another in registration order. A failing
//! handler never stops the ones after it: failures are collected and returned
//! together as a [`DispatchError`].
//!
//! ```rust,ignore
//! let registry = Arc::new(SubscriptionRegistry::new());
//! let dispatcher = Dispatcher::new(Arc::clone(&registry));
//!
//! let event = BoxedEvent::new(OrderCreated { order_id: 1 });
//! if let Err(err) = dispatcher.publish(event.event_type(), &event).await {
//!     for failure in &err.failures {
//!         eprintln!("{failure}");
//!     }
//! }
//! ```

use std::sync::Arc;

use tracing::{Instrument, Level, debug, span, warn};

use super::registry::SubscriptionRegistry;
use super::subscription::{SubscriberKind, SubscriptionEntry};
use crate::foundation::error::{DispatchError, HandlerFailure, PublishResult};
use crate::foundation::event::{BoxedEvent, EventTypeId};

/// Invokes registered subscriptions for published events.
///
/// # Thread Safety
///
/// `Dispatcher` is `Send + Sync`; concurrent publishes each work on their own
/// snapshot and never hold the registry lock while a handler runs.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<SubscriptionRegistry>,
}

impl Dispatcher {
    /// Creates a dispatcher reading from `registry`.
    pub fn new(registry: Arc<SubscriptionRegistry>) -> Self {
        Self { registry }
    }

    /// Returns the registry this dispatcher reads from.
    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// Publishes `event` to every subscription registered under `event_type`.
    ///
    /// Handlers run sequentially in registration order; each one is awaited
    /// before the next starts. Publishing with no subscribers succeeds.
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] listing every handler that failed, after all
    /// handlers were attempted.
    pub async fn publish(&self, event_type: EventTypeId, event: &BoxedEvent) -> PublishResult {
        let (attempted, failures) = self.dispatch(event_type, event).await;
        if failures.is_empty() {
            Ok(())
        } else {
            Err(DispatchError {
                event: event_type,
                attempted,
                failures,
            })
        }
    }

    /// Publishes `event` under its own type and then under each ancestor type,
    /// nearest parent first.
    ///
    /// Failures are aggregated over the whole walk and reported under the
    /// type of the original event.
    pub async fn publish_hierarchy(&self, event: &BoxedEvent) -> PublishResult {
        let root = event.event_type();
        let (mut attempted, mut failures) = self.dispatch(root, event).await;

        for ancestor in event.ancestors() {
            let (count, mut more) = self.dispatch(ancestor.event_type(), &ancestor).await;
            attempted += count;
            failures.append(&mut more);
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(DispatchError {
                event: root,
                attempted,
                failures,
            })
        }
    }

    async fn dispatch(
        &self,
        event_type: EventTypeId,
        event: &BoxedEvent,
    ) -> (usize, Vec<HandlerFailure>) {
        let span = span!(Level::DEBUG, "publish", event = %event_type);

        async {
            let entries = self.registry.entries_for(event_type);
            if entries.is_empty() {
                debug!("No subscribers");
                return (0, Vec::new());
            }

            let mut failures = Vec::new();
            for entry in entries.iter() {
                if let Err(failure) = invoke(entry, event_type, event).await {
                    warn!(
                        subscription = %failure.subscription(),
                        handler = failure.handler(),
                        error = %failure,
                        "Handler failed"
                    );
                    failures.push(failure);
                }
            }

            debug!(
                handlers = entries.len(),
                failed = failures.len(),
                "Dispatch complete"
            );
            (entries.len(), failures)
        }
        .instrument(span)
        .await
    }
}

async fn invoke(
    entry: &SubscriptionEntry,
    event_type: EventTypeId,
    event: &BoxedEvent,
) -> Result<(), HandlerFailure> {
    let subscriber = entry.subscriber();
    let invocation = |error| HandlerFailure::Invocation {
        subscription: entry.id(),
        handler: subscriber.label().to_string(),
        error,
    };

    match subscriber.kind() {
        SubscriberKind::Callback(callback) => callback(event.clone()).await.map_err(invocation),
        SubscriberKind::Instance(handler) => handler.handle(event).await.map_err(invocation),
        SubscriberKind::Factory(factory) => {
            let lease = factory.acquire(event_type).await.map_err(|source| {
                HandlerFailure::Resolution {
                    subscription: entry.id(),
                    handler: subscriber.label().to_string(),
                    source,
                }
            })?;
            let handler = Arc::clone(lease.handler());
            let result = handler.handle(event).await;
            lease.release();
            result.map_err(invocation)
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .finish()
    }
}
