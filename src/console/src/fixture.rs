//! Backend fixture
//!
//! JSON description of what the identity provider and the backend tables
//! hold, loaded into the in-memory collaborators.

use anyhow::{Context, Result};
use memberhub_core::memory::{DirectoryFixture, InMemoryDirectory, InMemoryGateway, Verification};
use memberhub_core::{AuthStateChange, GatewayError, Session, User};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How the provider answers the who-am-i check
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VerificationFixture {
    /// Confirm whoever holds the stored session
    #[default]
    FromSession,
    /// Always report this user
    User { user: User },
    /// Report nobody
    NoUser,
    /// Fail the check
    Error { error: GatewayError },
}

impl From<VerificationFixture> for Verification {
    fn from(fixture: VerificationFixture) -> Self {
        match fixture {
            VerificationFixture::FromSession => Verification::FromSession,
            VerificationFixture::User { user } => Verification::Fixed(Some(user)),
            VerificationFixture::NoUser => Verification::Fixed(None),
            VerificationFixture::Error { error } => Verification::Fail(error),
        }
    }
}

/// Provider and table contents
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BackendFixture {
    /// Session stored by the provider
    #[serde(default)]
    pub session: Option<Session>,

    /// Error returned instead of the stored session
    #[serde(default)]
    pub session_error: Option<GatewayError>,

    #[serde(default)]
    pub verification: VerificationFixture,

    /// Error returned by sign-out
    #[serde(default)]
    pub sign_out_error: Option<GatewayError>,

    #[serde(default)]
    pub directory: DirectoryFixture,
}

impl BackendFixture {
    /// Load a fixture from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read fixture {:?}", path.as_ref()))?;

        serde_json::from_str(&contents).context("Failed to parse fixture")
    }

    /// Identity provider holding this fixture's session
    pub fn gateway(&self) -> InMemoryGateway {
        let gateway = InMemoryGateway::new();
        gateway.set_session(self.session.clone());
        gateway.fail_session_retrieval(self.session_error.clone());
        gateway.set_verification(self.verification.clone().into());
        gateway.fail_sign_out(self.sign_out_error.clone());
        gateway
    }

    /// Backend tables holding this fixture's rows
    pub fn directory(&self) -> InMemoryDirectory {
        InMemoryDirectory::from_fixture(self.directory.clone())
    }
}

/// Load a notification sequence from a JSON array
pub fn load_events<P: AsRef<Path>>(path: P) -> Result<Vec<AuthStateChange>> {
    let contents = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read events {:?}", path.as_ref()))?;

    AuthStateChange::parse_sequence(&contents).context("Failed to parse events")
}
