//! Route guard
//!
//! Decides what the shell renders for a path given the session state.

use serde::{Deserialize, Serialize};

use crate::config::SessionConfig;
use crate::store::SessionSnapshot;

/// Outcome of guarding a route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "route", rename_all = "snake_case")]
pub enum RouteDecision {
    /// Session state not known yet
    Loading,
    /// Render the requested route
    Render,
    /// Go to another route instead
    Redirect(String),
}

/// Guard `path` against the session state
///
/// Signed-in users are kept away from the login route and unknown paths
/// send them home. Everyone else ends up on the login route.
pub fn guard(snapshot: &SessionSnapshot, path: &str, config: &SessionConfig) -> RouteDecision {
    if snapshot.loading {
        return RouteDecision::Loading;
    }

    let on_login = path == config.login_route;
    match (snapshot.is_authenticated(), on_login) {
        (true, true) => RouteDecision::Redirect(config.home_route.clone()),
        (true, false) if path == config.home_route => RouteDecision::Render,
        (true, false) => RouteDecision::Redirect(config.home_route.clone()),
        (false, true) => RouteDecision::Render,
        (false, false) => RouteDecision::Redirect(config.login_route.clone()),
    }
}
