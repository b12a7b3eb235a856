//! Link-time catalog of handler types.
//!
//! Every `#[register_handler]` contributes one [`HandlerDescriptor`] to
//! [`HANDLER_CATALOG`], so handler types can be selected by name from
//! configuration without a hand-maintained list.

use linkme::distributed_slice;

use crate::handler_type::HandlerType;

/// A static, `Copy` handle to a declared handler type.
#[derive(Debug, Clone, Copy)]
pub struct HandlerDescriptor {
    /// Name used in logs and configuration.
    pub name: &'static str,
    /// Produces the handler's registration token.
    pub create: fn() -> HandlerType,
}

impl HandlerDescriptor {
    /// Builds the registration token.
    #[inline]
    pub fn handler_type(&self) -> HandlerType {
        (self.create)()
    }
}

/// Every handler type registered with `#[register_handler]` in the binary.
#[distributed_slice]
pub static HANDLER_CATALOG: [HandlerDescriptor];

/// Returns every catalog entry.
pub fn catalog() -> &'static [HandlerDescriptor] {
    &HANDLER_CATALOG
}

/// Looks up a catalog entry by name.
pub fn find_handler(name: &str) -> Option<&'static HandlerDescriptor> {
    HANDLER_CATALOG.iter().find(|d| d.name == name)
}
