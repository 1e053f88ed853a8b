//! Error types for the session lifecycle

use memberhub_core::GatewayError;
use thiserror::Error;

/// Session lifecycle errors
///
/// Only user-initiated operations return these; notification handling and
/// initialization absorb gateway failures at the store boundary.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Identity provider call failed
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// The store was torn down before the operation ran
    #[error("Session store has been torn down")]
    Unmounted,

    /// Invalid session configuration
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;
