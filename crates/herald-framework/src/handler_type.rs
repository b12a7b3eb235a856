//! Handler type declarations.
//!
//! A [`HandlerType`] is the registration token for a handler that is
//! constructed per dispatch instead of being held by the bus. It carries the
//! explicit list of event types the handler processes, each paired with a
//! binding that turns a resolved instance into an invocable handler.
//!
//! ```rust,ignore
//! let handler = HandlerType::new::<NotifyOnOrderCreated>()
//!     .handles::<OrderCreated>()
//!     .handles::<OrderCancelled>()
//!     .constructible()
//!     .build();
//!
//! assert!(handler.handles_event(EventTypeId::of::<OrderCreated>()));
//! ```

use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use herald_core::{ErasedHandler, Event, EventHandler, EventTypeId, erase_handler, short_type_name};

/// A resolved handler instance, not yet bound to an event type.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Turns a resolved instance into a handler for one event type.
///
/// Returns `None` if the instance is not of the declared handler type.
pub type BindFn = fn(Instance) -> Option<Arc<dyn ErasedHandler>>;

/// Builds a fresh instance without a container registration.
pub type ConstructFn = fn() -> anyhow::Result<Instance>;

fn bind<E, H>(instance: Instance) -> Option<Arc<dyn ErasedHandler>>
where
    E: Event,
    H: EventHandler<E>,
{
    instance.downcast::<H>().ok().map(erase_handler::<E, H>)
}

fn construct_default<H: Default + Send + Sync + 'static>() -> anyhow::Result<Instance> {
    Ok(Arc::new(H::default()))
}

/// One "handles events of type `E`" capability of a handler type.
#[derive(Clone, Copy)]
pub struct HandledEvent {
    event_type: EventTypeId,
    bind: BindFn,
}

impl HandledEvent {
    /// The capability of `H` to handle `E`.
    pub fn of<E, H>() -> Self
    where
        E: Event,
        H: EventHandler<E>,
    {
        Self {
            event_type: EventTypeId::of::<E>(),
            bind: bind::<E, H>,
        }
    }

    /// Returns the handled event type.
    pub fn event_type(&self) -> EventTypeId {
        self.event_type
    }

    /// Binds a resolved instance to this capability.
    pub fn bind(&self, instance: Instance) -> Option<Arc<dyn ErasedHandler>> {
        (self.bind)(instance)
    }
}

impl fmt::Debug for HandledEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HandledEvent").field(&self.event_type).finish()
    }
}

/// Registration token of a late-bound handler type.
#[derive(Clone)]
pub struct HandlerType {
    type_id: TypeId,
    name: &'static str,
    handles: Vec<HandledEvent>,
    construct: Option<ConstructFn>,
}

impl HandlerType {
    /// Starts declaring the handler type `H`.
    pub fn new<H: Send + Sync + 'static>() -> HandlerTypeBuilder<H> {
        HandlerTypeBuilder {
            inner: HandlerType {
                type_id: TypeId::of::<H>(),
                name: short_type_name::<H>(),
                handles: Vec::new(),
                construct: None,
            },
            _handler: PhantomData,
        }
    }

    /// Returns the handler's `TypeId`.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the handler's name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the declared capabilities in declaration order.
    pub fn handled_events(&self) -> &[HandledEvent] {
        &self.handles
    }

    /// Returns the declared event types in declaration order.
    pub fn event_types(&self) -> impl Iterator<Item = EventTypeId> + '_ {
        self.handles.iter().map(HandledEvent::event_type)
    }

    /// Returns the capability for `event_type`, if declared.
    pub fn capability(&self, event_type: EventTypeId) -> Option<&HandledEvent> {
        self.handles.iter().find(|h| h.event_type == event_type)
    }

    /// Returns `true` if the handler declares `event_type`.
    pub fn handles_event(&self, event_type: EventTypeId) -> bool {
        self.capability(event_type).is_some()
    }

    /// Returns the fallback constructor, if the handler declared one.
    pub fn constructor(&self) -> Option<ConstructFn> {
        self.construct
    }

    /// Returns `true` if the token denotes `H`.
    pub fn is<H: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<H>()
    }
}

impl fmt::Debug for HandlerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerType")
            .field("name", &self.name)
            .field("handles", &self.handles)
            .field("constructible", &self.construct.is_some())
            .finish()
    }
}

/// Typed builder for [`HandlerType`].
pub struct HandlerTypeBuilder<H> {
    inner: HandlerType,
    _handler: PhantomData<fn() -> H>,
}

impl<H: Send + Sync + 'static> HandlerTypeBuilder<H> {
    /// Declares that `H` handles `E`.
    ///
    /// Declaring the same event twice keeps the first declaration.
    pub fn handles<E: Event>(mut self) -> Self
    where
        H: EventHandler<E>,
    {
        if !self.inner.handles_event(EventTypeId::of::<E>()) {
            self.inner.handles.push(HandledEvent::of::<E, H>());
        }
        self
    }

    /// Overrides the name used in logs and configuration.
    pub fn named(mut self, name: &'static str) -> Self {
        self.inner.name = name;
        self
    }

    /// Lets containers without a registration for `H` build it with `Default`.
    pub fn constructible(mut self) -> Self
    where
        H: Default,
    {
        self.inner.construct = Some(construct_default::<H>);
        self
    }

    /// Finishes the declaration.
    pub fn build(self) -> HandlerType {
        self.inner
    }
}

impl<H> From<HandlerTypeBuilder<H>> for HandlerType {
    fn from(builder: HandlerTypeBuilder<H>) -> Self {
        builder.inner
    }
}

/// Implemented by handler types that declare their own capabilities.
///
/// `#[register_handler(E1, E2)]` from `herald-macros` generates this impl.
pub trait DeclaresHandlers: Send + Sync + 'static {
    /// Returns the registration token of `Self`.
    fn handler_type() -> HandlerType;
}

/// An ordered list of handler types without duplicates.
#[derive(Clone, Debug, Default)]
pub struct HandlerTypeList {
    types: Vec<HandlerType>,
}

impl HandlerTypeList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `H`'s declaration unless `H` is already listed.
    pub fn add<H: DeclaresHandlers>(&mut self) -> &mut Self {
        self.push(H::handler_type());
        self
    }

    /// Appends a handler type unless one with the same `TypeId` is listed.
    ///
    /// Returns `false` if it was already present.
    pub fn push(&mut self, handler: impl Into<HandlerType>) -> bool {
        let handler = handler.into();
        if self.contains_type(handler.type_id()) {
            return false;
        }
        self.types.push(handler);
        true
    }

    /// Returns `true` if `H` is listed.
    pub fn contains<H: 'static>(&self) -> bool {
        self.contains_type(TypeId::of::<H>())
    }

    fn contains_type(&self, type_id: TypeId) -> bool {
        self.types.iter().any(|t| t.type_id() == type_id)
    }

    /// Iterates the handler types in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, HandlerType> {
        self.types.iter()
    }

    /// Returns the names of the listed handler types.
    pub fn names(&self) -> Vec<&'static str> {
        self.types.iter().map(HandlerType::name).collect()
    }

    /// Returns the number of listed handler types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl<'a> IntoIterator for &'a HandlerTypeList {
    type Item = &'a HandlerType;
    type IntoIter = std::slice::Iter<'a, HandlerType>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<HandlerType> for HandlerTypeList {
    fn from_iter<I: IntoIterator<Item = HandlerType>>(iter: I) -> Self {
        let mut list = Self::new();
        for handler in iter {
            list.push(handler);
        }
        list
    }
}

impl Extend<HandlerType> for HandlerTypeList {
    fn extend<I: IntoIterator<Item = HandlerType>>(&mut self, iter: I) {
        for handler in iter {
            self.push(handler);
        }
    }
}
