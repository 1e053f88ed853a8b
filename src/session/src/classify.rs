//! Classification of identity failures
//!
//! The provider reports failures as free-form text, so the decision between
//! "credentials are gone, sign the user out" and "something flaked, keep
//! going" is made by matching known phrases.

use memberhub_core::{GatewayError, UserId};
use std::fmt;

/// Phrases that mark a credential the provider will never accept again
pub const INVALID_CREDENTIAL_PHRASES: [&str; 4] = [
    "session_not_found",
    "JWT expired",
    "Invalid Refresh Token",
    "refresh_token_not_found",
];

/// Whether the provider error means the credentials are no longer valid
pub fn is_invalid_credential(error: &GatewayError) -> bool {
    error
        .texts()
        .any(|text| INVALID_CREDENTIAL_PHRASES.iter().any(|phrase| text.contains(phrase)))
}

/// Why a session could not be established or kept
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    /// The provider rejected the credentials
    InvalidCredentials(GatewayError),

    /// The who-am-i check disagreed with the candidate session
    VerificationMismatch {
        expected: Option<UserId>,
        actual: Option<UserId>,
    },

    /// Any other provider failure
    Transient(GatewayError),
}

impl AuthFailure {
    /// Classify a raw provider error
    pub fn classify(error: GatewayError) -> Self {
        if is_invalid_credential(&error) {
            AuthFailure::InvalidCredentials(error)
        } else {
            AuthFailure::Transient(error)
        }
    }

    /// Whether this failure takes the full sign-out path
    pub fn forces_sign_out(&self) -> bool {
        !matches!(self, AuthFailure::Transient(_))
    }

    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            AuthFailure::InvalidCredentials(_) => "invalid_credentials",
            AuthFailure::VerificationMismatch { .. } => "verification_mismatch",
            AuthFailure::Transient(_) => "transient",
        }
    }
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthFailure::InvalidCredentials(error) => write!(f, "invalid credentials: {}", error),
            AuthFailure::VerificationMismatch { expected, actual } => {
                let show = |id: &Option<UserId>| {
                    id.as_ref().map(|id| id.to_string()).unwrap_or_else(|| "<none>".to_string())
                };
                write!(
                    f,
                    "verification mismatch: expected {}, provider returned {}",
                    show(expected),
                    show(actual)
                )
            }
            AuthFailure::Transient(error) => write!(f, "transient failure: {}", error),
        }
    }
}
