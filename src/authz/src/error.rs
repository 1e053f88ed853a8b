//! Error types for role resolution

use memberhub_core::LookupError;
use thiserror::Error;

/// Role resolution errors
///
/// A lookup failure is never folded into a default role; callers see it as
/// an error distinct from "resolved to member".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthzError {
    /// A backend lookup in the fallback chain failed
    #[error("Role lookup on '{table}' failed: {message}")]
    Lookup { table: String, message: String },

    /// Invalid resolver configuration
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<LookupError> for AuthzError {
    fn from(e: LookupError) -> Self {
        AuthzError::Lookup {
            table: e.table,
            message: e.message,
        }
    }
}

/// Result type for role resolution
pub type Result<T> = std::result::Result<T, AuthzError>;
