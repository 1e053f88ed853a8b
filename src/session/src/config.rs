//! Session store configuration

use serde::{Deserialize, Serialize};

use crate::error::{Result, SessionError};

/// Session store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unauthenticated entry point, target of every hard navigation
    #[serde(default = "default_login_route")]
    pub login_route: String,

    /// Landing route for a signed-in user
    #[serde(default = "default_home_route")]
    pub home_route: String,

    /// Title of the notice shown when credentials are rejected
    #[serde(default = "default_expired_title")]
    pub expired_title: String,

    /// Body of the notice shown when credentials are rejected
    #[serde(default = "default_expired_description")]
    pub expired_description: String,
}

fn default_login_route() -> String { "/login".to_string() }
fn default_home_route() -> String { "/".to_string() }
fn default_expired_title() -> String { "Session expired".to_string() }
fn default_expired_description() -> String { "Please sign in again".to_string() }

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            login_route: default_login_route(),
            home_route: default_home_route(),
            expired_title: default_expired_title(),
            expired_description: default_expired_description(),
        }
    }
}

impl SessionConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        for (name, route) in [("login_route", &self.login_route), ("home_route", &self.home_route)] {
            if !route.starts_with('/') {
                return Err(SessionError::Configuration(format!(
                    "{} must be an absolute path, got '{}'",
                    name, route
                )));
            }
        }

        if self.login_route == self.home_route {
            return Err(SessionError::Configuration(
                "login_route and home_route must differ".to_string(),
            ));
        }

        Ok(())
    }
}
