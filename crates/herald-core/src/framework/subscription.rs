//! Subscription entries and handles.
//!
//! A [`Subscriber`] is one registered interest in an event type, in exactly
//! one of three variants (callback, instance, factory). The registry wraps it
//! into a [`SubscriptionEntry`] tagged with a unique [`SubscriptionId`] and
//! hands back a [`SubscriptionHandle`] that removes that exact entry.

use std::fmt;
use std::sync::{Arc, Weak};

use super::handler::{Callback, ErasedCallback, ErasedHandler, EventHandler, HandlerFactory};
use super::registry::SubscriptionRegistry;
use crate::foundation::event::{Event, EventTypeId, short_type_name};

/// Unique identifier of one subscription entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw numeric value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// Identity
// =============================================================================

/// What identifies a factory when unsubscribing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FactoryKey {
    /// Any factory producing this handler type matches.
    HandlerType(std::any::TypeId),
    /// Only this factory object matches.
    Address(usize),
}

/// Identity used to match subscribers on unsubscribe.
///
/// Callbacks and instances compare by reference; factories compare by
/// [`FactoryKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKey {
    /// Same callback (or a clone of it).
    Callback(usize),
    /// Same handler instance.
    Instance(usize),
    /// Same factory.
    Factory(FactoryKey),
}

impl HandlerKey {
    /// Key of a callback and all its clones.
    pub fn of_callback<E: Event>(callback: &Callback<E>) -> Self {
        Self::Callback(callback.identity())
    }

    /// Key of a shared handler instance.
    pub fn of_instance<H: ?Sized>(handler: &Arc<H>) -> Self {
        Self::Instance(Arc::as_ptr(handler) as *const () as usize)
    }

    /// Key of a factory.
    pub fn of_factory(factory: &Arc<dyn HandlerFactory>) -> Self {
        Self::Factory(match factory.handler_type_id() {
            Some(type_id) => FactoryKey::HandlerType(type_id),
            None => FactoryKey::Address(Arc::as_ptr(factory) as *const () as usize),
        })
    }

    /// Key matching every factory that produces `H`.
    pub fn of_handler_type<H: 'static>() -> Self {
        Self::Factory(FactoryKey::HandlerType(std::any::TypeId::of::<H>()))
    }
}

/// How many matching entries an unsubscribe removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Removal {
    /// Remove the earliest matching entry only.
    #[default]
    First,
    /// Remove every matching entry.
    All,
}

// =============================================================================
// Subscriber
// =============================================================================

/// The invocable part of a subscription.
#[derive(Clone)]
pub enum SubscriberKind {
    /// Called directly with the payload.
    Callback(ErasedCallback),
    /// A shared handler instance, never released by the registry.
    Instance(Arc<dyn ErasedHandler>),
    /// Produces a handler per dispatch.
    Factory(Arc<dyn HandlerFactory>),
}

/// One registered interest in an event type.
#[derive(Clone)]
pub struct Subscriber {
    kind: SubscriberKind,
    key: HandlerKey,
    label: Arc<str>,
}

impl Subscriber {
    /// A callback subscriber.
    pub fn callback<E: Event>(callback: &Callback<E>) -> Self {
        Self {
            kind: SubscriberKind::Callback(callback.erase()),
            key: HandlerKey::of_callback(callback),
            label: Arc::from(callback.name()),
        }
    }

    /// A handler-instance subscriber.
    pub fn instance<E, H>(handler: &Arc<H>) -> Self
    where
        E: Event,
        H: EventHandler<E> + ?Sized,
    {
        Self {
            kind: SubscriberKind::Instance(super::handler::erase_handler::<E, H>(Arc::clone(
                handler,
            ))),
            key: HandlerKey::of_instance(handler),
            label: Arc::from(short_type_name::<H>()),
        }
    }

    /// A factory subscriber.
    pub fn factory(factory: Arc<dyn HandlerFactory>) -> Self {
        Self {
            key: HandlerKey::of_factory(&factory),
            label: Arc::from(factory.handler_name()),
            kind: SubscriberKind::Factory(factory),
        }
    }

    /// Returns the invocable part.
    pub fn kind(&self) -> &SubscriberKind {
        &self.kind
    }

    /// Returns the identity used for unsubscribing.
    pub fn key(&self) -> HandlerKey {
        self.key
    }

    /// Returns the diagnostic label.
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("key", &self.key)
            .field("label", &self.label)
            .finish()
    }
}

/// A subscriber stored in the registry.
#[derive(Clone, Debug)]
pub struct SubscriptionEntry {
    id: SubscriptionId,
    subscriber: Subscriber,
}

impl SubscriptionEntry {
    pub(crate) fn new(id: SubscriptionId, subscriber: Subscriber) -> Self {
        Self { id, subscriber }
    }

    /// Returns the entry's identifier.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns the subscriber.
    pub fn subscriber(&self) -> &Subscriber {
        &self.subscriber
    }
}

// =============================================================================
// Handles
// =============================================================================

/// Disposable handle returned by subscribe.
///
/// Dropping the handle does **not** unsubscribe; call
/// [`dispose`](Self::dispose) or convert it into a [`SubscriptionGuard`].
#[derive(Debug)]
#[must_use = "keep the handle to be able to unsubscribe later"]
pub struct SubscriptionHandle {
    registry: Weak<SubscriptionRegistry>,
    event_type: EventTypeId,
    id: SubscriptionId,
}

impl SubscriptionHandle {
    pub(crate) fn new(
        registry: Weak<SubscriptionRegistry>,
        event_type: EventTypeId,
        id: SubscriptionId,
    ) -> Self {
        Self {
            registry,
            event_type,
            id,
        }
    }

    /// Returns the identifier of the entry this handle controls.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns the event type the entry is registered under.
    pub fn event_type(&self) -> EventTypeId {
        self.event_type
    }

    /// Removes the entry this handle was created for.
    ///
    /// Returns `false` if it was already gone or the registry was dropped.
    pub fn dispose(self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.remove(self.event_type, self.id),
            None => false,
        }
    }

    /// Converts the handle into a guard that disposes on drop.
    pub fn guard(self) -> SubscriptionGuard {
        SubscriptionGuard { handle: Some(self) }
    }
}

/// Removes its subscription when dropped.
#[derive(Debug)]
pub struct SubscriptionGuard {
    handle: Option<SubscriptionHandle>,
}

impl SubscriptionGuard {
    /// Keeps the subscription alive past the guard and returns the handle.
    pub fn into_handle(mut self) -> Option<SubscriptionHandle> {
        self.handle.take()
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.dispose();
        }
    }
}
