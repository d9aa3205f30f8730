//! Error types for route building.

use thiserror::Error;

/// Result type alias for route-building operations.
pub type RoutingResult<T> = Result<T, RoutingError>;

/// Errors that can occur while building routes.
///
/// Permission denial is deliberately not represented here: the permission
/// guard surfaces it to the client as a `401` response at request time, not
/// as a registration error.
#[derive(Debug, Error)]
pub enum RoutingError {
    /// A controller name could not be resolved by the registry.
    #[error("Unknown controller '{0}'")]
    UnknownController(String),

    /// A group body failed to register its routes.
    #[error("Route registration failed: {0}")]
    Registration(String),

    /// The mount-context stack lost a frame it should still hold.
    #[error("Mount context stack underflow")]
    ContextUnderflow,
}

impl RoutingError {
    /// Create an unknown-controller error.
    pub fn unknown_controller(name: impl Into<String>) -> Self {
        Self::UnknownController(name.into())
    }

    /// Create a registration error.
    pub fn registration(msg: impl Into<String>) -> Self {
        Self::Registration(msg.into())
    }
}
