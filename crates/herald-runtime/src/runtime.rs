//! Bootstrap of both bus facades from configuration.
//!
//! ```rust,ignore
//! use herald_runtime::HeraldRuntime;
//!
//! let container = ServiceContainer::new();
//! container.register_default::<ReserveInventory>();
//!
//! let runtime = HeraldRuntime::builder()
//!     .config_file("config/herald.toml")
//!     .container(container)
//!     .handler::<AuditTrail>()
//!     .build()?;
//!
//! runtime.distributed().publish(OrderCreated { order_id: 1 }).await?;
//! ```

use std::path::Path;
use std::sync::Arc;

use herald_framework::{
    DeclaresHandlers, DistributedBusOptions, HandlerContainer, HandlerType, HandlerTypeList,
    LocalBus, LocalDistributedBus, ScanReport, ServiceContainer, catalog, find_handler,
};
use tracing::{debug, info};

use crate::config::{ConfigLoader, DistributedConfig, HeraldConfig, validate_config};
use crate::error::RuntimeResult;
use crate::logging;

/// A local bus and a distributed bus sharing one registry, with the
/// configured handler types registered on the distributed face.
pub struct HeraldRuntime {
    config: HeraldConfig,
    local: Arc<LocalBus>,
    distributed: Arc<LocalDistributedBus>,
}

impl HeraldRuntime {
    /// Creates a runtime builder.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Builds a runtime from `config` with an empty [`ServiceContainer`].
    ///
    /// Handlers declared `constructible` still resolve through `Default`.
    pub fn from_config(config: &HeraldConfig) -> RuntimeResult<Self> {
        Self::builder().config(config.clone()).build()
    }

    /// Returns the configuration the runtime was built from.
    pub fn config(&self) -> &HeraldConfig {
        &self.config
    }

    /// Returns the local face.
    pub fn local(&self) -> &Arc<LocalBus> {
        &self.local
    }

    /// Returns the distributed face.
    pub fn distributed(&self) -> &Arc<LocalDistributedBus> {
        &self.distributed
    }

    /// Returns what auto-registration registered and skipped.
    pub fn scan_report(&self) -> &ScanReport {
        self.distributed.scan_report()
    }
}

impl std::fmt::Debug for HeraldRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeraldRuntime")
            .field("local", &self.local)
            .field("distributed", &self.distributed)
            .finish_non_exhaustive()
    }
}

/// Builder for [`HeraldRuntime`].
pub struct RuntimeBuilder {
    config: Option<HeraldConfig>,
    config_loader: ConfigLoader,
    container: Option<Arc<dyn HandlerContainer>>,
    handlers: HandlerTypeList,
    init_logging: bool,
}

impl RuntimeBuilder {
    /// Creates a builder that loads configuration from the current directory,
    /// then from `<user config dir>/herald`.
    pub fn new() -> Self {
        Self {
            config: None,
            config_loader: ConfigLoader::new()
                .with_current_dir()
                .with_user_config_dir(),
            container: None,
            handlers: HandlerTypeList::new(),
            init_logging: true,
        }
    }

    /// Uses `config` instead of loading one.
    pub fn config(mut self, config: HeraldConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Loads this configuration file.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g. "development", "production").
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Disables `HERALD_*` environment overrides.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Sets the container handler types are resolved from.
    pub fn container(mut self, container: impl HandlerContainer + 'static) -> Self {
        self.container = Some(Arc::new(container));
        self
    }

    /// Sets a shared container.
    pub fn shared_container(mut self, container: Arc<dyn HandlerContainer>) -> Self {
        self.container = Some(container);
        self
    }

    /// Registers `H` in addition to the configured handlers.
    pub fn handler<H: DeclaresHandlers>(mut self) -> Self {
        self.handlers.add::<H>();
        self
    }

    /// Registers an explicitly declared handler type.
    pub fn handler_type(mut self, handler: impl Into<HandlerType>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Leaves the global tracing subscriber alone.
    pub fn without_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    /// Builds the runtime.
    pub fn build(self) -> RuntimeResult<HeraldRuntime> {
        let config = match self.config {
            Some(config) => {
                validate_config(&config)?;
                config
            }
            None => self.config_loader.load()?,
        };

        if self.init_logging {
            logging::init_from_config(&config.logging);
        }

        let handlers = resolve_handlers(&config.distributed, self.handlers);
        let container = self
            .container
            .unwrap_or_else(|| Arc::new(ServiceContainer::new()));

        let local = Arc::new(LocalBus::new());
        let distributed = Arc::new(LocalDistributedBus::new(
            local.clone(),
            container,
            &DistributedBusOptions { handlers },
        ));

        info!(
            subscriptions = distributed.scan_report().registered.len(),
            log_level = %config.logging.level,
            "Herald runtime initialized"
        );

        Ok(HeraldRuntime {
            config,
            local,
            distributed,
        })
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Configured names first, in order, then explicitly added types, then the
/// rest of the catalog when `auto_discover` is set.
///
/// `config` must have passed `validate_config`, which rejects names missing
/// from the catalog.
fn resolve_handlers(config: &DistributedConfig, explicit: HandlerTypeList) -> HandlerTypeList {
    let mut handlers = HandlerTypeList::new();

    for descriptor in config.handlers.iter().filter_map(|name| find_handler(name)) {
        handlers.push(descriptor.handler_type());
    }

    handlers.extend(explicit.iter().cloned());

    if config.auto_discover {
        for descriptor in catalog() {
            if handlers.push(descriptor.handler_type()) {
                debug!(handler = descriptor.name, "Discovered handler type");
            }
        }
    }

    handlers
}
