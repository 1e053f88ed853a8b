//! In-memory identity provider

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tracing::debug;
use uuid::Uuid;

use crate::error::GatewayError;
use crate::traits::{AuthStateSubscription, GatewayResult, IdentityGateway, Subscription};
use crate::types::{AuthEvent, AuthStateChange, Session, User};

/// How the who-am-i check answers
#[derive(Debug, Clone)]
pub enum Verification {
    /// Confirm the subject of the stored session
    FromSession,
    /// Always answer with this user (or none)
    Fixed(Option<User>),
    /// Fail with this error
    Fail(GatewayError),
}

struct GatewayState {
    session: Option<Session>,
    session_error: Option<GatewayError>,
    verification: Verification,
    sign_out_error: Option<GatewayError>,
    emit_on_sign_out: bool,
    verification_gate: Option<Arc<Notify>>,
}

/// In-memory identity provider
///
/// Cheap to clone; clones share state, so a test can keep a handle while the
/// session store owns another.
#[derive(Clone)]
pub struct InMemoryGateway {
    state: Arc<RwLock<GatewayState>>,
    listeners: Arc<DashMap<Uuid, mpsc::UnboundedSender<AuthStateChange>>>,
    session_calls: Arc<AtomicUsize>,
    verify_calls: Arc<AtomicUsize>,
    sign_out_calls: Arc<AtomicUsize>,
}

impl InMemoryGateway {
    /// Create a gateway with no stored session
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(GatewayState {
                session: None,
                session_error: None,
                verification: Verification::FromSession,
                sign_out_error: None,
                emit_on_sign_out: true,
                verification_gate: None,
            })),
            listeners: Arc::new(DashMap::new()),
            session_calls: Arc::new(AtomicUsize::new(0)),
            verify_calls: Arc::new(AtomicUsize::new(0)),
            sign_out_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a gateway holding a stored session
    pub fn with_session(session: Session) -> Self {
        let gateway = Self::new();
        gateway.set_session(Some(session));
        gateway
    }

    /// Replace the stored session
    pub fn set_session(&self, session: Option<Session>) {
        self.state.write().session = session;
    }

    /// Make session retrieval fail (or succeed again with `None`)
    pub fn fail_session_retrieval(&self, error: Option<GatewayError>) {
        self.state.write().session_error = error;
    }

    /// Configure the who-am-i check
    pub fn set_verification(&self, verification: Verification) {
        self.state.write().verification = verification;
    }

    /// Make sign-out fail (or succeed again with `None`)
    pub fn fail_sign_out(&self, error: Option<GatewayError>) {
        self.state.write().sign_out_error = error;
    }

    /// Whether a successful sign-out pushes `SIGNED_OUT` to listeners
    pub fn set_emit_on_sign_out(&self, emit: bool) {
        self.state.write().emit_on_sign_out = emit;
    }

    /// Hold every who-am-i check until [`release_verification`] is called
    ///
    /// [`release_verification`]: InMemoryGateway::release_verification
    pub fn pause_verification(&self) {
        self.state.write().verification_gate = Some(Arc::new(Notify::new()));
    }

    /// Let held who-am-i checks complete
    pub fn release_verification(&self) {
        if let Some(gate) = self.state.write().verification_gate.take() {
            gate.notify_waiters();
            gate.notify_one();
        }
    }

    /// Push a notification to every live listener
    pub fn emit(&self, event: AuthEvent, session: Option<Session>) {
        let change = AuthStateChange::new(event, session);
        self.listeners
            .retain(|_, tx| tx.send(change.clone()).is_ok());
        debug!(event = %event, listeners = self.listeners.len(), "Emitted auth state change");
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Number of `current_session` calls
    pub fn session_calls(&self) -> usize {
        self.session_calls.load(Ordering::SeqCst)
    }

    /// Number of `verified_user` calls
    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    /// Number of `sign_out` calls
    pub fn sign_out_calls(&self) -> usize {
        self.sign_out_calls.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityGateway for InMemoryGateway {
    async fn current_session(&self) -> GatewayResult<Option<Session>> {
        self.session_calls.fetch_add(1, Ordering::SeqCst);

        let state = self.state.read();
        if let Some(error) = &state.session_error {
            return Err(error.clone());
        }
        Ok(state.session.clone())
    }

    async fn verified_user(&self) -> GatewayResult<Option<User>> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);

        let gate = self.state.read().verification_gate.clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let state = self.state.read();
        match &state.verification {
            Verification::FromSession => {
                Ok(state.session.as_ref().and_then(|s| s.user.clone()))
            }
            Verification::Fixed(user) => Ok(user.clone()),
            Verification::Fail(error) => Err(error.clone()),
        }
    }

    fn on_auth_state_change(&self) -> AuthStateSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        self.listeners.insert(id, tx);

        let listeners = self.listeners.clone();
        let handle = Subscription::new(id, move || {
            listeners.remove(&id);
        });

        AuthStateSubscription { events: rx, handle }
    }

    async fn sign_out(&self) -> GatewayResult<()> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);

        let emit = {
            let mut state = self.state.write();
            if let Some(error) = &state.sign_out_error {
                return Err(error.clone());
            }
            state.session = None;
            state.emit_on_sign_out
        };

        if emit {
            self.emit(AuthEvent::SignedOut, None);
        }
        Ok(())
    }
}
