//! Auth-state transitions
//!
//! Maps a notification (event kind plus candidate session) to the ordered
//! effects the store must carry out. Nothing here touches shared state; the
//! store is the only interpreter of a [`Plan`].

use memberhub_core::{AuthEvent, AuthStateChange, Session};
use std::sync::Arc;

use crate::classify::AuthFailure;
use crate::config::SessionConfig;
use crate::shell::Notice;

/// A single step the store performs
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Replace the session slot
    Publish(Option<Arc<Session>>),
    /// Reset every identity-scoped cache
    ResetCaches,
    /// Ask the provider to end the session, ignoring failures
    SignOut,
    /// Show a notice
    Notify(Notice),
    /// Reset the application to a route; always the last effect
    HardNavigate(String),
}

impl Effect {
    pub fn is_navigation(&self) -> bool {
        matches!(self, Effect::HardNavigate(_))
    }
}

/// What to do with a notification
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    /// Apply the effects as they are
    Apply(Vec<Effect>),
    /// Re-verify `candidate` with the provider, then apply `then`
    Verify {
        candidate: Arc<Session>,
        then: Vec<Effect>,
    },
}

impl Plan {
    /// Whether the plan ends the session for good
    pub fn is_terminal(&self) -> bool {
        match self {
            Plan::Apply(effects) => effects.iter().any(Effect::is_navigation),
            Plan::Verify { .. } => false,
        }
    }
}

/// Plan the handling of a notification
///
/// A candidate session without a user is treated as absent.
pub fn plan(change: &AuthStateChange, config: &SessionConfig) -> Plan {
    if change.event.is_terminal() {
        return Plan::Apply(terminate(config));
    }

    let candidate = change
        .session
        .as_ref()
        .filter(|session| session.user.is_some())
        .map(|session| Arc::new(session.clone()));

    match (change.event, candidate) {
        (AuthEvent::SignedIn, Some(candidate)) => Plan::Verify {
            then: vec![Effect::ResetCaches, Effect::Publish(Some(candidate.clone()))],
            candidate,
        },
        (_, Some(candidate)) => Plan::Verify {
            then: vec![Effect::Publish(Some(candidate.clone()))],
            candidate,
        },
        (_, None) => Plan::Apply(clear()),
    }
}

/// Effects for a session that ended normally
pub fn terminate(config: &SessionConfig) -> Vec<Effect> {
    vec![
        Effect::Publish(None),
        Effect::ResetCaches,
        Effect::HardNavigate(config.login_route.clone()),
    ]
}

/// Effects for a notification that carries no session
pub fn clear() -> Vec<Effect> {
    vec![Effect::Publish(None), Effect::ResetCaches]
}

/// Effects for a failed retrieval or verification
///
/// Transient failures produce no effects.
pub fn on_failure(failure: &AuthFailure, config: &SessionConfig) -> Vec<Effect> {
    if !failure.forces_sign_out() {
        return Vec::new();
    }

    vec![
        Effect::Publish(None),
        Effect::ResetCaches,
        Effect::SignOut,
        Effect::Notify(Notice::destructive(
            config.expired_title.clone(),
            config.expired_description.clone(),
        )),
        Effect::HardNavigate(config.login_route.clone()),
    ]
}
