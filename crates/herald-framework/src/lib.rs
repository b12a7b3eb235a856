//! # Herald Framework
//!
//! Everything above the registry and the dispatcher:
//!
//! - Lifecycle containers that construct handlers per dispatch
//!   ([`HandlerContainer`], [`ServiceContainer`])
//! - Handler type declarations and the link-time handler catalog
//!   ([`HandlerType`], [`DeclaresHandlers`], [`HANDLER_CATALOG`])
//! - Container-backed and transient handler factories
//!   ([`IocHandlerFactory`], [`TransientHandlerFactory`])
//! - Auto-registration of handler types ([`scan_and_register`])
//! - The two bus facades ([`LocalBus`], [`LocalDistributedBus`]) and their
//!   contracts ([`EventBus`], [`EventBusExt`])

pub mod bus;
pub mod catalog;
pub mod container;
pub mod distributed;
pub mod handler_type;
pub mod local;
pub mod resolver;
pub mod scanner;

pub use bus::{DistributedEventBus, EventBus, EventBusExt, LocalEventBus};
pub use catalog::{HANDLER_CATALOG, HandlerDescriptor, catalog, find_handler};
pub use container::{HandlerContainer, HandlerScope, ServiceContainer};
pub use distributed::{DistributedBusOptions, LocalDistributedBus};
pub use handler_type::{
    BindFn, ConstructFn, DeclaresHandlers, HandledEvent, HandlerType, HandlerTypeBuilder,
    HandlerTypeList, Instance,
};
pub use local::LocalBus;
pub use resolver::{HandlerResolver, IocHandlerFactory, ScopedHandler, TransientHandlerFactory};
pub use scanner::{Registration, RegistrationDescriptor, ScanReport, describe, scan_and_register};

// Used by code generated from `herald-macros`.
#[doc(hidden)]
pub use linkme;
