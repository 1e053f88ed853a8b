//! Session store
//!
//! Holds the current session and the loading flag, owns the subscription to
//! the provider's auth-state notifications and is the only writer of the
//! session slot. Three sources feed it: [`SessionStore::initialize`], the
//! notification listener and [`SessionStore::revalidate`]. Each of them
//! re-verifies a candidate before publishing it; the last one to finish wins.

use memberhub_core::traits::{AuthStateSubscription, Subscription};
use memberhub_core::{AuthStateChange, IdentityGateway, Session, UserId};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cache::CacheCoordinator;
use crate::classify::AuthFailure;
use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::shell::{Navigator, Notice, Notifier};
use crate::transition::{self, Effect, Plan};

/// Published session state
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    /// Current verified session
    pub session: Option<Arc<Session>>,
    /// True until the first initialization finishes
    pub loading: bool,
}

impl SessionSnapshot {
    fn initial() -> Self {
        Self {
            session: None,
            loading: true,
        }
    }

    /// Identifier of the signed-in user
    pub fn user_id(&self) -> Option<UserId> {
        self.session
            .as_ref()
            .and_then(|session| session.user_id().cloned())
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }
}

/// Session store
///
/// One instance per mount. After [`teardown`](SessionStore::teardown),
/// whether explicit or caused by a hard navigation, the instance ignores
/// every further input and a fresh store has to be built.
pub struct SessionStore {
    gateway: Arc<dyn IdentityGateway>,
    caches: Arc<CacheCoordinator>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    config: SessionConfig,
    state: watch::Sender<SessionSnapshot>,
    mounted: AtomicBool,
    initialized: AtomicBool,
    terminating: AtomicBool,
    subscription: Mutex<Option<Subscription>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SessionStore {
    /// Create a mounted store
    pub fn new(
        gateway: Arc<dyn IdentityGateway>,
        caches: Arc<CacheCoordinator>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
        config: SessionConfig,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(SessionSnapshot::initial());

        Arc::new(Self {
            gateway,
            caches,
            navigator,
            notifier,
            config,
            state,
            mounted: AtomicBool::new(true),
            initialized: AtomicBool::new(false),
            terminating: AtomicBool::new(false),
            subscription: Mutex::new(None),
            listener: Mutex::new(None),
        })
    }

    /// Subscribe to notifications, then initialize
    pub async fn start(self: &Arc<Self>) {
        self.subscribe();
        self.initialize().await;
    }

    /// Load the stored session and publish it once verified
    ///
    /// Runs at most once per mount. The loading flag is cleared when it
    /// finishes, unless the store was torn down meanwhile.
    pub async fn initialize(&self) {
        if !self.is_mounted() {
            debug!("Session store not mounted, skipping initialization");
            return;
        }
        if self.initialized.swap(true, Ordering::SeqCst) {
            debug!("Session store already initialized");
            return;
        }

        let outcome = self.retrieve_verified().await;

        if !self.is_mounted() {
            debug!("Session store torn down during initialization, discarding result");
            return;
        }

        match outcome {
            Ok(session) => {
                info!(
                    user_id = ?session.as_ref().and_then(|s| s.user_id()),
                    "Session initialized"
                );
                self.publish(session);
            }
            Err(failure) => self.handle_auth_error(failure).await,
        }

        self.finish_loading();
    }

    /// Register for auth-state notifications
    ///
    /// Notifications are handled one at a time, in arrival order, on a
    /// spawned listener task. Calling this twice keeps the first
    /// subscription.
    pub fn subscribe(self: &Arc<Self>) {
        if !self.is_mounted() {
            debug!("Session store not mounted, not subscribing");
            return;
        }

        let mut slot = self.subscription.lock();
        if slot.is_some() {
            debug!("Already subscribed to auth state changes");
            return;
        }

        let AuthStateSubscription { mut events, handle } = self.gateway.on_auth_state_change();
        info!(subscription = %handle.id(), "Subscribed to auth state changes");
        *slot = Some(handle);
        drop(slot);

        let store = Arc::downgrade(self);
        let task = tokio::spawn(async move {
            while let Some(change) = events.recv().await {
                let Some(store) = store.upgrade() else { break };
                if !store.is_mounted() {
                    break;
                }
                store.handle_notification(change).await;
            }
            debug!("Auth state listener stopped");
        });

        *self.listener.lock() = Some(task);
    }

    /// Handle one auth-state notification
    pub async fn handle_notification(&self, change: AuthStateChange) {
        if !self.is_mounted() {
            return;
        }

        let candidate_user = change.session.as_ref().and_then(|s| s.user_id().cloned());
        info!(event = %change.event, user_id = ?candidate_user, "Auth state changed");

        match transition::plan(&change, &self.config) {
            Plan::Apply(effects) => self.apply(effects).await,
            Plan::Verify { candidate, then } => match self.verify(&candidate).await {
                Ok(()) => self.apply(then).await,
                Err(failure) => self.handle_auth_error(failure).await,
            },
        }
    }

    /// React to a failed retrieval or verification
    ///
    /// Invalid credentials and verification mismatches end the session:
    /// clear it, reset caches, sign out, tell the user and hard-navigate to
    /// the login route. Anything else is only logged.
    pub async fn handle_auth_error(&self, failure: AuthFailure) {
        if !self.is_mounted() {
            return;
        }

        let effects = transition::on_failure(&failure, &self.config);
        if effects.is_empty() {
            warn!(kind = failure.kind(), error = %failure, "Auth failure not forcing sign-out");
            return;
        }

        error!(kind = failure.kind(), error = %failure, "Auth failure, ending session");
        self.apply(effects).await;
    }

    /// Re-run retrieve-and-verify for the stored session
    pub async fn revalidate(&self) {
        if !self.is_mounted() {
            return;
        }

        let outcome = self.retrieve_verified().await;

        if !self.is_mounted() {
            debug!("Session store torn down during revalidation, discarding result");
            return;
        }

        match outcome {
            Ok(session) => {
                debug!(user_id = ?session.as_ref().and_then(|s| s.user_id()), "Session revalidated");
                self.publish(session);
            }
            Err(failure) => self.handle_auth_error(failure).await,
        }
    }

    /// User-initiated sign-out
    ///
    /// Caches are reset before the provider call. Navigation is left to the
    /// `SIGNED_OUT` notification the provider pushes afterwards.
    pub async fn sign_out(&self) -> Result<()> {
        if !self.is_mounted() {
            return Err(SessionError::Unmounted);
        }

        info!(user_id = ?self.snapshot().user_id(), "Signing out");
        self.caches.reset_all();

        match self.gateway.sign_out().await {
            Ok(()) => {
                self.notifier.notify(Notice::info(
                    "Logged out successfully",
                    "You have been logged out of your account",
                ));
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Sign-out failed");
                self.notifier
                    .notify(Notice::destructive("Logout failed", e.message.clone()));
                Err(SessionError::Gateway(e))
            }
        }
    }

    /// Stop accepting input and release the subscription
    ///
    /// Idempotent.
    pub fn teardown(&self) {
        if !self.mounted.swap(false, Ordering::SeqCst) {
            return;
        }

        if let Some(handle) = self.subscription.lock().take() {
            handle.unsubscribe();
        }
        if let Some(task) = self.listener.lock().take() {
            task.abort();
        }

        info!("Session store torn down");
    }

    /// Current session state
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// Current verified session
    pub fn session(&self) -> Option<Arc<Session>> {
        self.state.borrow().session.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    /// Receiver that observes every published change
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    pub fn caches(&self) -> &Arc<CacheCoordinator> {
        &self.caches
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    async fn retrieve_verified(&self) -> std::result::Result<Option<Arc<Session>>, AuthFailure> {
        let stored = self
            .gateway
            .current_session()
            .await
            .map_err(AuthFailure::classify)?;

        let Some(session) = stored.filter(|s| s.user.is_some()) else {
            return Ok(None);
        };

        self.verify(&session).await?;
        Ok(Some(Arc::new(session)))
    }

    /// Independent who-am-i check against the candidate's subject
    async fn verify(&self, candidate: &Session) -> std::result::Result<(), AuthFailure> {
        let expected = candidate.user_id().cloned();

        match self.gateway.verified_user().await {
            Ok(Some(user)) if Some(&user.id) == expected.as_ref() => Ok(()),
            Ok(user) => Err(AuthFailure::VerificationMismatch {
                expected,
                actual: user.map(|u| u.id),
            }),
            Err(e) => Err(AuthFailure::classify(e)),
        }
    }

    async fn apply(&self, effects: Vec<Effect>) {
        if effects.iter().any(Effect::is_navigation)
            && self.terminating.swap(true, Ordering::SeqCst)
        {
            debug!("Session already terminating, skipping");
            return;
        }

        for effect in effects {
            if !self.is_mounted() {
                debug!("Session store torn down, dropping remaining effects");
                return;
            }

            match effect {
                Effect::Publish(session) => {
                    self.publish(session);
                }
                Effect::ResetCaches => self.caches.reset_all(),
                Effect::SignOut => {
                    if let Err(e) = self.gateway.sign_out().await {
                        warn!(error = %e, "Forced sign-out failed");
                    }
                }
                Effect::Notify(notice) => self.notifier.notify(notice),
                Effect::HardNavigate(route) => {
                    info!(route = %route, "Hard navigation");
                    self.navigator.hard_navigate(&route);
                    self.teardown();
                }
            }
        }
    }

    /// Replace the session slot, resetting caches first when the identity
    /// changes
    fn publish(&self, session: Option<Arc<Session>>) -> bool {
        if !self.is_mounted() {
            return false;
        }
        if session.is_some() && self.terminating.load(Ordering::SeqCst) {
            debug!("Session terminating, not publishing");
            return false;
        }

        let next = session.as_ref().and_then(|s| s.user_id().cloned());
        let previous = self.state.borrow().user_id();
        if previous != next {
            debug!(from = ?previous, to = ?next, "Identity changed, resetting caches");
            self.caches.reset_all();
        }

        self.state.send_modify(|state| state.session = session);
        true
    }

    fn finish_loading(&self) {
        let cleared = self.state.send_if_modified(|state| {
            if state.loading && self.is_mounted() {
                state.loading = false;
                true
            } else {
                false
            }
        });

        if cleared {
            debug!("Session loading finished");
        }
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.teardown();
    }
}
