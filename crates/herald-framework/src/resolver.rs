//! Handler resolution and the factories built on it.
//!
//! [`HandlerResolver`] adapts a [`HandlerContainer`] to the dispatcher: it
//! opens one scope per resolution and hands back a [`ScopedHandler`] whose
//! release closes that scope. [`IocHandlerFactory`] and
//! [`TransientHandlerFactory`] are the [`HandlerFactory`] implementations the
//! bus registers for late-bound handler types.

use std::any::TypeId;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use herald_core::{
    Event, EventHandler, EventTypeId, HandlerFactory, HandlerLease, ResolveError, ResolveResult,
    erase_handler, short_type_name,
};
use tracing::trace;

use crate::container::{HandlerContainer, HandlerScope};
use crate::handler_type::{HandlerType, Instance};

// =============================================================================
// Resolver
// =============================================================================

/// Resolves handler types through a lifecycle container.
#[derive(Clone)]
pub struct HandlerResolver {
    container: Arc<dyn HandlerContainer>,
}

impl HandlerResolver {
    /// Creates a resolver backed by `container`.
    pub fn new(container: Arc<dyn HandlerContainer>) -> Self {
        Self { container }
    }

    /// Opens a scope and resolves `handler` inside it.
    ///
    /// The scope is closed again if resolution fails.
    pub async fn resolve(&self, handler: &HandlerType) -> ResolveResult<ScopedHandler> {
        let scope = self.container.create_scope();
        let instance = scope.resolve(handler).await?;
        Ok(ScopedHandler {
            instance,
            scope: Some(scope),
        })
    }
}

impl fmt::Debug for HandlerResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerResolver").finish_non_exhaustive()
    }
}

/// A resolved instance together with the scope that owns it.
///
/// Releasing (or dropping) closes the scope exactly once.
pub struct ScopedHandler {
    instance: Instance,
    scope: Option<Box<dyn HandlerScope>>,
}

impl ScopedHandler {
    /// Returns the resolved instance.
    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    /// Closes the scope.
    pub fn release(mut self) {
        self.scope.take();
    }
}

impl fmt::Debug for ScopedHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedHandler")
            .field("released", &self.scope.is_none())
            .finish()
    }
}

// =============================================================================
// Container-backed factory
// =============================================================================

/// Resolves a [`HandlerType`] from a container on every dispatch.
///
/// Two factories for the same handler type are interchangeable when
/// unsubscribing.
pub struct IocHandlerFactory {
    resolver: HandlerResolver,
    handler: HandlerType,
}

impl IocHandlerFactory {
    /// Creates a factory resolving `handler` through `resolver`.
    pub fn new(resolver: HandlerResolver, handler: HandlerType) -> Self {
        Self { resolver, handler }
    }

    /// Returns the handler type this factory resolves.
    pub fn handler_type(&self) -> &HandlerType {
        &self.handler
    }
}

#[async_trait]
impl HandlerFactory for IocHandlerFactory {
    async fn acquire(&self, event_type: EventTypeId) -> ResolveResult<HandlerLease> {
        let capability = self
            .handler
            .capability(event_type)
            .ok_or(ResolveError::Unhandled {
                handler: self.handler.name(),
                event: event_type,
            })?;

        let scoped = self.resolver.resolve(&self.handler).await?;
        let handler = capability
            .bind(Arc::clone(scoped.instance()))
            .ok_or(ResolveError::WrongInstance {
                handler: self.handler.name(),
            })?;

        let name = self.handler.name();
        Ok(HandlerLease::with_release(handler, move || {
            scoped.release();
            trace!(handler = name, "Released");
        }))
    }

    fn handler_name(&self) -> &str {
        self.handler.name()
    }

    fn handler_type_id(&self) -> Option<TypeId> {
        Some(self.handler.type_id())
    }
}

impl fmt::Debug for IocHandlerFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IocHandlerFactory")
            .field("handler", &self.handler.name())
            .finish()
    }
}

// =============================================================================
// Transient factory
// =============================================================================

/// Builds a fresh `H` with `Default` for every dispatch and drops it after.
pub struct TransientHandlerFactory<E, H> {
    _marker: PhantomData<fn() -> (E, H)>,
}

impl<E, H> TransientHandlerFactory<E, H>
where
    E: Event,
    H: EventHandler<E> + Default,
{
    /// Creates the factory.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<E, H> Default for TransientHandlerFactory<E, H>
where
    E: Event,
    H: EventHandler<E> + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E, H> HandlerFactory for TransientHandlerFactory<E, H>
where
    E: Event,
    H: EventHandler<E> + Default,
{
    async fn acquire(&self, event_type: EventTypeId) -> ResolveResult<HandlerLease> {
        if !event_type.is::<E>() {
            return Err(ResolveError::Unhandled {
                handler: short_type_name::<H>(),
                event: event_type,
            });
        }
        Ok(HandlerLease::new(erase_handler::<E, H>(Arc::new(H::default()))))
    }

    fn handler_name(&self) -> &str {
        short_type_name::<H>()
    }

    fn handler_type_id(&self) -> Option<TypeId> {
        Some(TypeId::of::<H>())
    }
}
