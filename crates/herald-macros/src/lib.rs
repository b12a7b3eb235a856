//! Procedural macros for the Herald event bus.
//!
//! This crate provides:
//!
//! - `#[derive(Event)]` - Implements `herald_core::Event`
//! - `#[register_handler(...)]` - Declares a handler type's events and adds it
//!   to the handler catalog
//!
//! ```rust,ignore
//! use herald::prelude::*;
//!
//! #[derive(Clone, Event)]
//! pub struct OrderEvent {
//!     pub order_id: u64,
//! }
//!
//! #[derive(Clone, Event)]
//! #[event(name = "order.created")]
//! pub struct OrderCreated {
//!     #[event(parent)]
//!     pub order: OrderEvent,
//!     pub total_cents: u64,
//! }
//!
//! #[register_handler(OrderCreated, constructible)]
//! #[derive(Default)]
//! pub struct NotifyOnOrderCreated;
//! ```

mod event;
mod handler;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Derives `herald_core::Event` for structs and enums.
///
/// # Attributes
///
/// - `#[event(name = "...")]` - Override the event name (default: the type name)
/// - `#[event(parent)]` on a field - Declare the embedded parent event; the
///   field type must implement `Event + Clone`
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Clone, Event)]
/// #[event(name = "order.shipped")]
/// pub struct OrderShipped {
///     #[event(parent)]
///     pub order: OrderEvent,
///     pub carrier: String,
/// }
///
/// let shipped = OrderShipped { order: OrderEvent { order_id: 7 }, carrier: "DHL".into() };
/// assert_eq!(shipped.order_id, 7); // through Deref
/// ```
#[proc_macro_derive(Event, attributes(event))]
pub fn derive_event(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match event::derive_event(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Declares the events a handler type handles and registers it in the
/// handler catalog.
///
/// The type must implement `EventHandler<E>` for every listed `E`.
///
/// # Example
///
/// ```rust,ignore
/// #[register_handler(OrderCreated, OrderCancelled, name = "inventory")]
/// pub struct ReserveInventory {
///     stock: Arc<StockService>,
/// }
/// ```
#[proc_macro_attribute]
pub fn register_handler(attr: TokenStream, item: TokenStream) -> TokenStream {
    handler::register_handler(attr, item)
}
