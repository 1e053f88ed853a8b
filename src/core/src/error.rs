//! Unified error types shared by the memberhub crates
//!
//! `CoreError` covers failures of the shared collaborators. `GatewayError` and
//! `LookupError` are the raw failures reported by the identity provider and by
//! the backend lookup tables; higher layers classify them.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type for the memberhub platform
#[derive(Debug, Error)]
pub enum CoreError {
    /// Identity provider failures
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Backend table lookup failures
    #[error("Lookup error: {0}")]
    Lookup(#[from] LookupError),

    /// Serialization/Deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input/state
    #[error("Invalid: {0}")]
    Invalid(String),
}

impl CoreError {
    /// Create an invalid error
    pub fn invalid<S: Into<String>>(msg: S) -> Self {
        CoreError::Invalid(msg.into())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}

/// Failure reported by the identity provider
///
/// The provider reports failures as free-form messages, optionally with an
/// error code and the HTTP status of the failed call. Callers classify these
/// by message, never by Rust type.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub struct GatewayError {
    /// Human-readable message as returned by the provider
    pub message: String,

    /// Provider error code (e.g. `refresh_token_not_found`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// HTTP status of the failed call, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl GatewayError {
    /// Create an error carrying only a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            status: None,
        }
    }

    /// Attach a provider error code
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Attach an HTTP status
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Every piece of text the provider attached to this error
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.message.as_str()).chain(self.code.as_deref())
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.code, self.status) {
            (Some(code), Some(status)) => write!(f, "{} ({}, status {})", self.message, code, status),
            (Some(code), None) => write!(f, "{} ({})", self.message, code),
            (None, Some(status)) => write!(f, "{} (status {})", self.message, status),
            (None, None) => write!(f, "{}", self.message),
        }
    }
}

/// Failure of a single-row lookup against a backend table
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("lookup on '{table}' failed: {message}")]
pub struct LookupError {
    /// Table that was queried
    pub table: String,

    /// Backend message
    pub message: String,
}

impl LookupError {
    pub fn new(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_error_display() {
        let err = GatewayError::new("JWT expired");
        assert_eq!(err.to_string(), "JWT expired");

        let err = GatewayError::new("Invalid Refresh Token")
            .with_code("refresh_token_not_found")
            .with_status(400);
        assert_eq!(
            err.to_string(),
            "Invalid Refresh Token (refresh_token_not_found, status 400)"
        );
    }

    #[test]
    fn test_gateway_error_texts_include_code() {
        let err = GatewayError::new("Bad request").with_code("session_not_found");
        let texts: Vec<_> = err.texts().collect();
        assert_eq!(texts, vec!["Bad request", "session_not_found"]);
    }

    #[test]
    fn test_error_conversion() {
        let err: CoreError = LookupError::new("user_roles", "connection reset").into();
        assert!(matches!(err, CoreError::Lookup(_)));
        assert_eq!(
            err.to_string(),
            "Lookup error: lookup on 'user_roles' failed: connection reset"
        );

        let err: CoreError = GatewayError::new("offline").into();
        assert_eq!(err.to_string(), "Gateway error: offline");
    }
}
