//! Auth-state notifications pushed by the identity provider

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::session::Session;
use crate::error::{CoreError, Result};

/// Kind of an auth-state change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEvent {
    /// Emitted once on subscription with the stored session
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    UserDeleted,
    PasswordRecovery,
    MfaChallengeVerified,
}

impl AuthEvent {
    /// Wire name used by the provider
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthEvent::InitialSession => "INITIAL_SESSION",
            AuthEvent::SignedIn => "SIGNED_IN",
            AuthEvent::SignedOut => "SIGNED_OUT",
            AuthEvent::TokenRefreshed => "TOKEN_REFRESHED",
            AuthEvent::UserUpdated => "USER_UPDATED",
            AuthEvent::UserDeleted => "USER_DELETED",
            AuthEvent::PasswordRecovery => "PASSWORD_RECOVERY",
            AuthEvent::MfaChallengeVerified => "MFA_CHALLENGE_VERIFIED",
        }
    }

    /// Events that end the current session without anything to verify
    pub fn is_terminal(&self) -> bool {
        matches!(self, AuthEvent::SignedOut | AuthEvent::UserDeleted)
    }
}

impl fmt::Display for AuthEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthEvent {
    type Err = CoreError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "INITIAL_SESSION" => Ok(AuthEvent::InitialSession),
            "SIGNED_IN" => Ok(AuthEvent::SignedIn),
            "SIGNED_OUT" => Ok(AuthEvent::SignedOut),
            "TOKEN_REFRESHED" => Ok(AuthEvent::TokenRefreshed),
            "USER_UPDATED" => Ok(AuthEvent::UserUpdated),
            "USER_DELETED" => Ok(AuthEvent::UserDeleted),
            "PASSWORD_RECOVERY" => Ok(AuthEvent::PasswordRecovery),
            "MFA_CHALLENGE_VERIFIED" => Ok(AuthEvent::MfaChallengeVerified),
            other => Err(CoreError::invalid(format!("unknown auth event '{}'", other))),
        }
    }
}

/// A single push notification: the event kind and the candidate session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthStateChange {
    pub event: AuthEvent,

    #[serde(default)]
    pub session: Option<Session>,
}

impl AuthStateChange {
    pub fn new(event: AuthEvent, session: Option<Session>) -> Self {
        Self { event, session }
    }

    /// Parse a recorded notification sequence (a JSON array)
    pub fn parse_sequence(json: &str) -> Result<Vec<Self>> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_provider_names() {
        assert_eq!("SIGNED_IN".parse::<AuthEvent>().unwrap(), AuthEvent::SignedIn);
        assert_eq!("USER_DELETED".parse::<AuthEvent>().unwrap(), AuthEvent::UserDeleted);
        assert_eq!(AuthEvent::TokenRefreshed.to_string(), "TOKEN_REFRESHED");
    }

    #[test]
    fn test_unknown_event_rejected() {
        assert!("SIGNED_SIDEWAYS".parse::<AuthEvent>().is_err());
    }

    #[test]
    fn test_parse_sequence() {
        let changes = AuthStateChange::parse_sequence(
            r#"[{"event":"TOKEN_REFRESHED","session":{"access_token":"t","user":{"id":"u1"}}},{"event":"SIGNED_OUT"}]"#,
        )
        .unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[1], AuthStateChange::new(AuthEvent::SignedOut, None));

        let err = AuthStateChange::parse_sequence("{\"event\":").unwrap_err();
        assert!(matches!(err, CoreError::Serialization(_)));
    }

    #[test]
    fn test_terminal_events() {
        assert!(AuthEvent::SignedOut.is_terminal());
        assert!(AuthEvent::UserDeleted.is_terminal());
        assert!(!AuthEvent::TokenRefreshed.is_terminal());
    }

    #[test]
    fn test_change_deserializes_wire_names() {
        let change: AuthStateChange =
            serde_json::from_str(r#"{"event":"TOKEN_REFRESHED"}"#).unwrap();
        assert_eq!(change.event, AuthEvent::TokenRefreshed);
        assert!(change.session.is_none());
    }
}
