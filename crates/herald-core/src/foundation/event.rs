//! Event model for the Herald bus.
//!
//! This module provides the core event infrastructure:
//!
//! - [`Event`] - Base trait for every payload published on the bus
//! - [`EventTypeId`] - The key subscriptions are registered under
//! - [`BoxedEvent`] - A type-erased, cheaply cloneable payload
//!
//! # Parent Events
//!
//! An event may embed the event it refines (for example an `OrderCreated`
//! carrying an `OrderEvent`). The embedded value is reported by
//! [`Event::parent`], which lets callers publish the same occurrence at every
//! level of the hierarchy:
//!
//! ```rust,ignore
//! use herald_core::{BoxedEvent, Event};
//!
//! #[derive(Clone, Event)]
//! struct OrderEvent { order_id: u64 }
//!
//! #[derive(Clone, Event)]
//! #[event(name = "order.created")]
//! struct OrderCreated {
//!     #[event(parent)]
//!     base: OrderEvent,
//!     total_cents: u64,
//! }
//!
//! let event = BoxedEvent::new(OrderCreated { base: OrderEvent { order_id: 7 }, total_cents: 990 });
//! assert_eq!(event.ancestors().count(), 1);
//! ```

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

// ============================================================================
// Core Event Trait
// ============================================================================

/// The base trait for all events carried by the bus.
///
/// Events are type-erased as `dyn Event` and recovered through [`as_any`] or
/// [`into_any`]. Use `#[derive(Event)]` from `herald-macros` instead of
/// writing the impl by hand.
///
/// [`as_any`]: Event::as_any
/// [`into_any`]: Event::into_any
pub trait Event: Any + Send + Sync {
    /// Returns the human-readable name of this event.
    fn event_name(&self) -> &'static str;

    /// Returns a reference to self as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Converts a shared event into a shared `Any` so it can be downcast
    /// without cloning the payload.
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;

    /// Returns the parent event embedded in this one, if any.
    fn parent(&self) -> Option<BoxedEvent> {
        None
    }
}

// ============================================================================
// Event Type Identifier
// ============================================================================

/// Identifies one family of event payloads.
///
/// Two identifiers are equal iff they denote the same Rust type. The name is
/// carried for diagnostics only and takes no part in comparison or hashing.
#[derive(Clone, Copy)]
pub struct EventTypeId {
    id: TypeId,
    name: &'static str,
}

impl EventTypeId {
    /// Returns the identifier of `E`.
    pub fn of<E: Event>() -> Self {
        Self {
            id: TypeId::of::<E>(),
            name: short_type_name::<E>(),
        }
    }

    /// Returns the underlying `TypeId`.
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Returns the short type name used in logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns `true` if this identifier denotes `E`.
    pub fn is<E: Event>(&self) -> bool {
        self.id == TypeId::of::<E>()
    }
}

impl PartialEq for EventTypeId {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EventTypeId {}

impl Hash for EventTypeId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for EventTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EventTypeId").field(&self.name).finish()
    }
}

impl fmt::Display for EventTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Strips the module path from `type_name::<T>()`, keeping generic arguments.
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = type_name::<T>();
    let head = full.split('<').next().unwrap_or(full);
    match head.rfind("::") {
        Some(pos) => &full[pos + 2..],
        None => full,
    }
}

// ============================================================================
// Boxed Event
// ============================================================================

/// A type-erased container for events that supports runtime downcasting.
///
/// `BoxedEvent` wraps any [`Event`] in an `Arc` and remembers its
/// [`EventTypeId`], so it can be handed to many handlers without copying.
#[derive(Clone)]
pub struct BoxedEvent {
    event_type: EventTypeId,
    inner: Arc<dyn Event>,
}

impl BoxedEvent {
    /// Creates a new `BoxedEvent` from any type implementing `Event`.
    pub fn new<E: Event>(event: E) -> Self {
        Self::from_arc(Arc::new(event))
    }

    /// Wraps an already shared event.
    pub fn from_arc<E: Event>(event: Arc<E>) -> Self {
        Self {
            event_type: EventTypeId::of::<E>(),
            inner: event,
        }
    }

    /// Returns the identifier of the concrete payload type.
    pub fn event_type(&self) -> EventTypeId {
        self.event_type
    }

    /// Returns the inner `Arc<dyn Event>`.
    pub fn inner(&self) -> &Arc<dyn Event> {
        &self.inner
    }

    /// Attempts to downcast to a concrete event type.
    pub fn downcast_ref<E: Event>(&self) -> Option<&E> {
        self.inner.as_any().downcast_ref()
    }

    /// Attempts to recover a shared handle to the concrete event.
    pub fn downcast_arc<E: Event>(&self) -> Option<Arc<E>> {
        Arc::clone(&self.inner).into_any().downcast::<E>().ok()
    }

    /// Iterates over the parent chain, nearest parent first.
    pub fn ancestors(&self) -> Ancestors {
        Ancestors {
            next: self.inner.parent(),
        }
    }
}

impl std::ops::Deref for BoxedEvent {
    type Target = dyn Event;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl fmt::Debug for BoxedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxedEvent")
            .field("event_type", &self.event_type)
            .field("event_name", &self.event_name())
            .finish()
    }
}

/// Iterator returned by [`BoxedEvent::ancestors`].
pub struct Ancestors {
    next: Option<BoxedEvent>,
}

impl Iterator for Ancestors {
    type Item = BoxedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        self.next = current.inner.parent();
        Some(current)
    }
}
