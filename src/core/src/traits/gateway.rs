//! Identity provider contract

use async_trait::async_trait;
use std::fmt;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::GatewayError;
use crate::types::{AuthStateChange, Session, User};

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Handle for a registered auth-state listener
///
/// Releasing the handle (explicitly or by dropping it) unregisters the
/// listener; the release callback runs at most once.
pub struct Subscription {
    id: Uuid,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Create a handle that runs `release` when unsubscribed
    pub fn new(id: Uuid, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            id,
            release: Some(Box::new(release)),
        }
    }

    /// Listener identifier
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Unregister the listener
    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.release.is_some())
            .finish()
    }
}

/// Notification stream plus the handle that ends it
#[derive(Debug)]
pub struct AuthStateSubscription {
    /// Notifications in arrival order
    pub events: mpsc::UnboundedReceiver<AuthStateChange>,

    /// Unsubscribe capability
    pub handle: Subscription,
}

/// Identity provider gateway
///
/// Issues and validates session tokens, pushes auth-state notifications and
/// supports forced sign-out. `verified_user` must perform an independent
/// round trip to the provider rather than echo the locally stored session.
#[async_trait]
pub trait IdentityGateway: Send + Sync {
    /// Currently stored session, if any
    async fn current_session(&self) -> GatewayResult<Option<Session>>;

    /// Who-am-i check against the provider
    async fn verified_user(&self) -> GatewayResult<Option<User>>;

    /// Register for auth-state notifications
    fn on_auth_state_change(&self) -> AuthStateSubscription;

    /// End the stored session
    async fn sign_out(&self) -> GatewayResult<()>;
}
