//! Foundation layer: the event model and the error taxonomy.

pub mod error;
pub mod event;

pub use error::{
    DispatchError, HandlerFailure, PayloadMismatch, PublishResult, ResolveError, ResolveResult,
};
pub use event::{Ancestors, BoxedEvent, Event, EventTypeId, short_type_name};
