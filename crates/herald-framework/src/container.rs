//! Lifecycle container capability.
//!
//! The bus never constructs late-bound handlers itself. It asks a
//! [`HandlerContainer`] for a [`HandlerScope`], resolves the handler inside it
//! and drops the scope when the dispatch is over, which disposes every
//! instance the scope created.
//!
//! [`ServiceContainer`] is the in-process implementation: constructors are
//! registered by handler type and every scope caches what it resolved.
//!
//! ```rust,ignore
//! let container = ServiceContainer::new();
//! container.register_default::<NotifyOnOrderCreated>();
//! container.register(|| Ok(AuditTrail::connect("audit.log")?));
//!
//! let scope = container.create_scope();
//! let instance = scope.resolve(&NotifyOnOrderCreated::handler_type()).await?;
//! drop(scope); // disposes `instance` unless it is still referenced
//! ```

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use herald_core::{ResolveError, ResolveResult};
use parking_lot::{Mutex, RwLock};
use tracing::trace;

use crate::handler_type::{HandlerType, Instance};

/// Produces resolution scopes.
pub trait HandlerContainer: Send + Sync {
    /// Opens a new resolution scope.
    fn create_scope(&self) -> Box<dyn HandlerScope>;
}

/// A resolution scope; dropping it releases everything it resolved.
#[async_trait]
pub trait HandlerScope: Send + Sync {
    /// Resolves an instance of `handler` within this scope.
    async fn resolve(&self, handler: &HandlerType) -> ResolveResult<Instance>;
}

type Constructor = Arc<dyn Fn() -> anyhow::Result<Instance> + Send + Sync>;

// =============================================================================
// ServiceContainer
// =============================================================================

/// In-process [`HandlerContainer`] keyed by handler type.
///
/// Types without a registration fall back to the constructor declared on
/// their [`HandlerType`], if any.
///
/// # Thread Safety
///
/// Registration and scope creation may happen concurrently; scopes see
/// registrations made after they were opened.
#[derive(Clone, Default)]
pub struct ServiceContainer {
    constructors: Arc<RwLock<HashMap<TypeId, Constructor>>>,
    next_scope: Arc<AtomicU64>,
}

impl ServiceContainer {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a constructor for `H`, replacing any earlier one.
    pub fn register<H, F>(&self, constructor: F) -> &Self
    where
        H: Send + Sync + 'static,
        F: Fn() -> anyhow::Result<H> + Send + Sync + 'static,
    {
        let constructor: Constructor =
            Arc::new(move || constructor().map(|h| Arc::new(h) as Instance));
        self.constructors
            .write()
            .insert(TypeId::of::<H>(), constructor);
        self
    }

    /// Registers `H::default` as the constructor for `H`.
    pub fn register_default<H: Default + Send + Sync + 'static>(&self) -> &Self {
        self.register(|| Ok(H::default()))
    }

    /// Registers a shared instance returned by every scope.
    pub fn register_instance<H: Send + Sync + 'static>(&self, instance: Arc<H>) -> &Self {
        let constructor: Constructor = Arc::new(move || Ok(Arc::clone(&instance) as Instance));
        self.constructors
            .write()
            .insert(TypeId::of::<H>(), constructor);
        self
    }

    /// Returns `true` if `H` has a registration.
    pub fn is_registered<H: 'static>(&self) -> bool {
        self.constructors.read().contains_key(&TypeId::of::<H>())
    }

    /// Returns the number of registrations.
    pub fn len(&self) -> usize {
        self.constructors.read().len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.constructors.read().is_empty()
    }
}

impl HandlerContainer for ServiceContainer {
    fn create_scope(&self) -> Box<dyn HandlerScope> {
        let id = self.next_scope.fetch_add(1, Ordering::Relaxed);
        trace!(scope = id, "Scope opened");
        Box::new(ServiceScope {
            id,
            constructors: Arc::clone(&self.constructors),
            instances: Mutex::new(HashMap::new()),
        })
    }
}

impl std::fmt::Debug for ServiceContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContainer")
            .field("registrations", &self.len())
            .finish()
    }
}

/// Scope created by [`ServiceContainer`].
struct ServiceScope {
    id: u64,
    constructors: Arc<RwLock<HashMap<TypeId, Constructor>>>,
    instances: Mutex<HashMap<TypeId, Instance>>,
}

#[async_trait]
impl HandlerScope for ServiceScope {
    async fn resolve(&self, handler: &HandlerType) -> ResolveResult<Instance> {
        if let Some(instance) = self.instances.lock().get(&handler.type_id()) {
            return Ok(Arc::clone(instance));
        }

        let registered = self.constructors.read().get(&handler.type_id()).cloned();
        let result = match (registered, handler.constructor()) {
            (Some(constructor), _) => constructor(),
            (None, Some(construct)) => construct(),
            (None, None) => {
                return Err(ResolveError::NotRegistered {
                    handler: handler.name(),
                });
            }
        };
        let instance = result.map_err(|e| ResolveError::Construction {
            handler: handler.name(),
            reason: format!("{e:#}"),
        })?;

        trace!(scope = self.id, handler = handler.name(), "Resolved");
        self.instances
            .lock()
            .insert(handler.type_id(), Arc::clone(&instance));
        Ok(instance)
    }
}

impl Drop for ServiceScope {
    fn drop(&mut self) {
        trace!(
            scope = self.id,
            instances = self.instances.get_mut().len(),
            "Scope closed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use herald_core::{Event, EventHandler};
    use std::any::Any;
    use std::sync::atomic::AtomicUsize;

    struct Ping;

    impl Event for Ping {
        fn event_name(&self) -> &'static str {
            "ping"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    static DROPPED: AtomicUsize = AtomicUsize::new(0);

    #[derive(Default)]
    struct Counted;

    impl Drop for Counted {
        fn drop(&mut self) {
            DROPPED.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl EventHandler<Ping> for Counted {
        async fn handle_event(&self, _event: &Ping) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct Fallback;

    #[async_trait]
    impl EventHandler<Ping> for Fallback {
        async fn handle_event(&self, _event: &Ping) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct Broken;

    #[async_trait]
    impl EventHandler<Ping> for Broken {
        async fn handle_event(&self, _event: &Ping) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_scope_caches_and_disposes() {
        let container = ServiceContainer::new();
        container.register_default::<Counted>();
        let handler = HandlerType::new::<Counted>().handles::<Ping>().build();

        let before = DROPPED.load(Ordering::SeqCst);
        {
            let scope = container.create_scope();
            let first = scope.resolve(&handler).await.unwrap();
            let second = scope.resolve(&handler).await.unwrap();
            assert!(Arc::ptr_eq(&first, &second));
            drop((first, second));
            assert_eq!(DROPPED.load(Ordering::SeqCst), before);
        }
        assert_eq!(DROPPED.load(Ordering::SeqCst), before + 1);
    }

    #[tokio::test]
    async fn test_scopes_are_independent() {
        let container = ServiceContainer::new();
        container.register_default::<Fallback>();
        let handler = HandlerType::new::<Fallback>().handles::<Ping>().build();

        let a = container.create_scope().resolve(&handler).await.unwrap();
        let b = container.create_scope().resolve(&handler).await.unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn test_unregistered_type() {
        let container = ServiceContainer::new();
        let handler = HandlerType::new::<Broken>().handles::<Ping>().build();
        let err = container
            .create_scope()
            .resolve(&handler)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::NotRegistered { handler: "Broken" }));
    }

    #[tokio::test]
    async fn test_declared_constructor_fallback() {
        let container = ServiceContainer::new();
        let handler = HandlerType::new::<Fallback>()
            .handles::<Ping>()
            .constructible()
            .build();
        let instance = container.create_scope().resolve(&handler).await.unwrap();
        assert!(instance.downcast::<Fallback>().is_ok());
    }

    #[tokio::test]
    async fn test_constructor_failure() {
        let container = ServiceContainer::new();
        container.register::<Broken, _>(|| anyhow::bail!("database unavailable"));
        let handler = HandlerType::new::<Broken>().handles::<Ping>().build();

        let err = container
            .create_scope()
            .resolve(&handler)
            .await
            .unwrap_err();
        match err {
            ResolveError::Construction { handler, reason } => {
                assert_eq!(handler, "Broken");
                assert!(reason.contains("database unavailable"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resolve_without_runtime() {
        let container = ServiceContainer::new();
        container.register_default::<Fallback>();
        let handler = HandlerType::new::<Fallback>().handles::<Ping>().build();

        let scope = container.create_scope();
        let instance = tokio_test::assert_ok!(tokio_test::block_on(scope.resolve(&handler)));
        assert!(instance.is::<Fallback>());
    }

    #[tokio::test]
    async fn test_registered_instance_is_shared() {
        let container = ServiceContainer::new();
        let shared = Arc::new(Fallback);
        container.register_instance(Arc::clone(&shared));
        assert!(container.is_registered::<Fallback>());

        let handler = HandlerType::new::<Fallback>().handles::<Ping>().build();
        let resolved = container.create_scope().resolve(&handler).await.unwrap();
        assert!(Arc::ptr_eq(&resolved.downcast::<Fallback>().unwrap(), &shared));
    }
}
