//! Error types for handler resolution and dispatch.

use thiserror::Error;

use super::event::EventTypeId;
use crate::framework::subscription::SubscriptionId;

// =============================================================================
// Resolution Errors
// =============================================================================

/// Errors raised while turning a handler type into a live instance.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// The lifecycle container has no registration for the handler type.
    #[error("handler type '{handler}' is not registered in the container")]
    NotRegistered {
        /// Name of the requested handler type.
        handler: &'static str,
    },

    /// The registered constructor failed.
    #[error("failed to construct handler '{handler}': {reason}")]
    Construction {
        /// Name of the requested handler type.
        handler: &'static str,
        /// Reason reported by the constructor.
        reason: String,
    },

    /// The container produced an instance of the wrong type.
    #[error("container returned an instance that is not a '{handler}'")]
    WrongInstance {
        /// Name of the requested handler type.
        handler: &'static str,
    },

    /// The handler type does not declare a capability for the event.
    #[error("handler '{handler}' does not handle '{event}'")]
    Unhandled {
        /// Name of the requested handler type.
        handler: &'static str,
        /// The event type that was dispatched.
        event: EventTypeId,
    },
}

/// The payload handed to a handler is not of the type it handles.
///
/// Raised when an event is published under an identifier that does not
/// match its concrete type.
#[derive(Debug, Clone, Error)]
#[error("payload of type '{actual}' cannot be handled as '{expected}'")]
pub struct PayloadMismatch {
    /// The event type the handler expects.
    pub expected: EventTypeId,
    /// The concrete type of the published payload.
    pub actual: EventTypeId,
}

// =============================================================================
// Dispatch Errors
// =============================================================================

/// A failure of one subscription during a publish.
#[derive(Debug, Error)]
pub enum HandlerFailure {
    /// The handler instance could not be resolved.
    #[error("could not resolve handler '{handler}': {source}")]
    Resolution {
        /// The subscription that failed.
        subscription: SubscriptionId,
        /// Diagnostic label of the subscription.
        handler: String,
        /// Underlying resolution error.
        source: ResolveError,
    },

    /// The handler ran and returned an error.
    #[error("handler '{handler}' failed: {error:#}")]
    Invocation {
        /// The subscription that failed.
        subscription: SubscriptionId,
        /// Diagnostic label of the subscription.
        handler: String,
        /// Error returned by the handler.
        error: anyhow::Error,
    },
}

impl HandlerFailure {
    /// Returns the subscription the failure came from.
    pub fn subscription(&self) -> SubscriptionId {
        match self {
            Self::Resolution { subscription, .. } | Self::Invocation { subscription, .. } => {
                *subscription
            }
        }
    }

    /// Returns the diagnostic label of the failing handler.
    pub fn handler(&self) -> &str {
        match self {
            Self::Resolution { handler, .. } | Self::Invocation { handler, .. } => handler,
        }
    }

    /// Returns `true` if the handler could not be resolved.
    pub fn is_resolution(&self) -> bool {
        matches!(self, Self::Resolution { .. })
    }
}

/// Aggregate failure of a publish: every handler was attempted and at least
/// one of them failed.
#[derive(Debug, Error)]
#[error(
    "{count} of {attempted} handler(s) failed while dispatching '{event}'",
    count = .failures.len()
)]
pub struct DispatchError {
    /// The event type the publish was issued for.
    pub event: EventTypeId,
    /// Number of subscriptions that were invoked.
    pub attempted: usize,
    /// Collected failures in invocation order.
    pub failures: Vec<HandlerFailure>,
}

impl DispatchError {
    /// Returns the labels of the failing handlers in invocation order.
    pub fn failed_handlers(&self) -> Vec<&str> {
        self.failures.iter().map(HandlerFailure::handler).collect()
    }

    /// Returns the number of handlers that completed successfully.
    pub fn succeeded(&self) -> usize {
        self.attempted.saturating_sub(self.failures.len())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result of a publish.
pub type PublishResult = Result<(), DispatchError>;

/// Result of resolving a handler.
pub type ResolveResult<T> = Result<T, ResolveError>;
