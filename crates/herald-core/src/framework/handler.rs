//! Handler system for the Herald bus.
//!
//! Three shapes of handler can be subscribed:
//!
//! - [`Callback<E>`] - an async closure receiving `Arc<E>`
//! - [`EventHandler<E>`] - a handler object, shared as `Arc<H>`
//! - [`HandlerFactory`] - produces a handler per dispatch and releases it
//!   afterwards through a [`HandlerLease`]
//!
//! All of them are reduced to [`ErasedHandler`] (or an erased callback) before
//! they reach the registry, so the dispatcher never needs to know the
//! concrete handler type.
//!
//! # Example
//!
//! ```rust,ignore
//! use herald_core::{Callback, EventHandler};
//!
//! struct AuditLog;
//!
//! #[async_trait::async_trait]
//! impl EventHandler<OrderCreated> for AuditLog {
//!     async fn handle_event(&self, event: &OrderCreated) -> anyhow::Result<()> {
//!         tracing::info!(order = event.order_id, "order created");
//!         Ok(())
//!     }
//! }
//!
//! let callback = Callback::new(|event: Arc<OrderCreated>| async move {
//!     println!("order {}", event.order_id);
//!     Ok(())
//! });
//! ```

use std::any::TypeId;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
pub use futures::future::BoxFuture;

use crate::foundation::error::{PayloadMismatch, ResolveResult};
use crate::foundation::event::{BoxedEvent, Event, EventTypeId, short_type_name};

// ============================================================================
// Handler Traits
// ============================================================================

/// A handler object for events of type `E`.
///
/// A type may implement this trait for several event types; each
/// implementation is an independent handling capability.
#[async_trait]
pub trait EventHandler<E: Event>: Send + Sync + 'static {
    /// Handles one event.
    async fn handle_event(&self, event: &E) -> anyhow::Result<()>;
}

/// A type-erased handler invoked by the dispatcher.
#[async_trait]
pub trait ErasedHandler: Send + Sync {
    /// Handles one type-erased event.
    async fn handle(&self, event: &BoxedEvent) -> anyhow::Result<()>;
}

/// Adapts an `Arc<H: EventHandler<E>>` to [`ErasedHandler`].
struct TypedHandler<E, H: ?Sized> {
    inner: Arc<H>,
    _event: PhantomData<fn(E)>,
}

#[async_trait]
impl<E, H> ErasedHandler for TypedHandler<E, H>
where
    E: Event,
    H: EventHandler<E> + ?Sized,
{
    async fn handle(&self, event: &BoxedEvent) -> anyhow::Result<()> {
        let typed = downcast_payload::<E>(event)?;
        self.inner.handle_event(typed).await
    }
}

/// Erases a typed handler instance.
pub fn erase_handler<E, H>(handler: Arc<H>) -> Arc<dyn ErasedHandler>
where
    E: Event,
    H: EventHandler<E> + ?Sized,
{
    Arc::new(TypedHandler::<E, H> {
        inner: handler,
        _event: PhantomData,
    })
}

fn downcast_payload<E: Event>(event: &BoxedEvent) -> Result<&E, PayloadMismatch> {
    event.downcast_ref::<E>().ok_or(PayloadMismatch {
        expected: EventTypeId::of::<E>(),
        actual: event.event_type(),
    })
}

// ============================================================================
// Callback
// ============================================================================

/// A type-erased callback stored in the registry.
pub type ErasedCallback =
    Arc<dyn Fn(BoxedEvent) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

type TypedCallbackFn<E> =
    Arc<dyn Fn(Arc<E>) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// An async callback for events of type `E`.
///
/// Cloning a `Callback` keeps its identity: unsubscribing with a clone removes
/// the subscription made with the original.
pub struct Callback<E> {
    f: TypedCallbackFn<E>,
    name: &'static str,
}

impl<E: Event> Callback<E> {
    /// Wraps an async closure.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Arc<E>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            f: Arc::new(move |event: Arc<E>| -> BoxFuture<'static, anyhow::Result<()>> {
                Box::pin(f(event))
            }),
            name: short_type_name::<F>(),
        }
    }

    /// Overrides the label used in diagnostics.
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Returns the diagnostic label.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Address identifying this callback and its clones.
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.f) as *const () as usize
    }

    /// Invokes the callback directly.
    pub fn call(&self, event: Arc<E>) -> BoxFuture<'static, anyhow::Result<()>> {
        (self.f)(event)
    }

    pub(crate) fn erase(&self) -> ErasedCallback {
        let f = Arc::clone(&self.f);
        Arc::new(
            move |event: BoxedEvent| -> BoxFuture<'static, anyhow::Result<()>> {
                match event.downcast_arc::<E>() {
                    Some(typed) => f(typed),
                    None => {
                        let mismatch = PayloadMismatch {
                            expected: EventTypeId::of::<E>(),
                            actual: event.event_type(),
                        };
                        Box::pin(async move { Err::<(), _>(anyhow::Error::from(mismatch)) })
                    }
                }
            },
        )
    }
}

impl<E> Clone for Callback<E> {
    fn clone(&self) -> Self {
        Self {
            f: Arc::clone(&self.f),
            name: self.name,
        }
    }
}

impl<E> fmt::Debug for Callback<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback").field("name", &self.name).finish()
    }
}

// ============================================================================
// Handler Factory
// ============================================================================

/// Produces a handler for the duration of one dispatch.
///
/// The dispatcher calls [`acquire`](HandlerFactory::acquire) right before
/// invoking the handler and releases the returned [`HandlerLease`] right
/// after, whatever the outcome.
#[async_trait]
pub trait HandlerFactory: Send + Sync {
    /// Produces a handler able to process `event_type`.
    async fn acquire(&self, event_type: EventTypeId) -> ResolveResult<HandlerLease>;

    /// Diagnostic label of the produced handler.
    fn handler_name(&self) -> &str;

    /// The handler type this factory produces, if it produces a single type.
    ///
    /// Factories reporting the same handler type are considered the same
    /// subscription target when unsubscribing. Factories returning `None`
    /// are compared by address.
    fn handler_type_id(&self) -> Option<TypeId> {
        None
    }
}

/// A handler acquired from a [`HandlerFactory`].
///
/// The release action runs exactly once: on [`release`](HandlerLease::release)
/// or, failing that, when the lease is dropped.
pub struct HandlerLease {
    handler: Arc<dyn ErasedHandler>,
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl HandlerLease {
    /// A lease with nothing to release.
    pub fn new(handler: Arc<dyn ErasedHandler>) -> Self {
        Self {
            handler,
            release: None,
        }
    }

    /// A lease that runs `release` when the handler is given back.
    pub fn with_release<F>(handler: Arc<dyn ErasedHandler>, release: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            handler,
            release: Some(Box::new(release)),
        }
    }

    /// Returns the leased handler.
    pub fn handler(&self) -> &Arc<dyn ErasedHandler> {
        &self.handler
    }

    /// Gives the handler back.
    pub fn release(mut self) {
        self.run_release();
    }

    fn run_release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for HandlerLease {
    fn drop(&mut self) {
        self.run_release();
    }
}

impl fmt::Debug for HandlerLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerLease")
            .field("released", &self.release.is_none())
            .finish()
    }
}
