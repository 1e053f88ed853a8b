//! Role access for the signed-in user
//!
//! Binds the role resolver to the session store. A resolved role is only
//! trusted while the session it was resolved for is still the current one
//! and while it is younger than the resolver's freshness window. Otherwise
//! the role reads as absent and loading until the next
//! [`RoleAccess::refresh`]; [`RoleAccess::current_role`] refreshes on demand.

use chrono::{DateTime, Utc};
use memberhub_authz::{gate, AuthzError, Role, RoleResolver, RoleSource, SectionDescriptor, SectionSelection};
use memberhub_core::UserId;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::store::SessionStore;

/// Role state exposed to the application
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoleSnapshot {
    /// User the role was resolved for
    pub user_id: Option<UserId>,
    pub role: Option<Role>,
    pub source: Option<RoleSource>,
    /// When the fallback chain produced `role`
    pub resolved_at: Option<DateTime<Utc>>,
    /// True while the session or the role is still being resolved
    pub loading: bool,
    /// Lookup failure of the last resolution
    pub error: Option<AuthzError>,
}

impl RoleSnapshot {
    fn pending(user_id: Option<UserId>, loading: bool) -> Self {
        Self {
            user_id,
            loading,
            ..Self::default()
        }
    }

    /// Whether the resolved role is older than `ttl`
    pub fn is_expired(&self, ttl: Duration) -> bool {
        let Some(resolved_at) = self.resolved_at else {
            return false;
        };
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => Utc::now() - resolved_at > ttl,
            Err(_) => false,
        }
    }
}

struct RoleState {
    snapshot: RoleSnapshot,
    /// Ticket of the most recently started refresh
    issued: u64,
    /// Ticket of the refresh whose result is in `snapshot`
    applied: u64,
}

/// Role state tied to a session store
pub struct RoleAccess {
    store: Arc<SessionStore>,
    resolver: RoleResolver,
    state: RwLock<RoleState>,
}

impl RoleAccess {
    pub fn new(store: Arc<SessionStore>, resolver: RoleResolver) -> Self {
        Self {
            store,
            resolver,
            state: RwLock::new(RoleState {
                snapshot: RoleSnapshot::default(),
                issued: 0,
                applied: 0,
            }),
        }
    }

    /// Resolve the role for the current session
    ///
    /// A result that arrives after the session changed identity is dropped
    /// and `Ok(None)` is returned. A result that arrives after a later
    /// refresh was already applied is dropped as well; the applied role is
    /// returned instead.
    pub async fn refresh(&self) -> Result<Option<Role>, AuthzError> {
        let session = self.store.session();
        let user_id = session.as_ref().and_then(|s| s.user_id().cloned());

        let ticket = {
            let mut state = self.state.write();
            if state.snapshot.user_id != user_id {
                state.snapshot = RoleSnapshot::pending(user_id.clone(), false);
            }
            state.issued += 1;
            state.snapshot.loading = true;
            state.issued
        };

        let result = self.resolver.resolve(session.as_deref()).await;

        let current = self.store.snapshot().user_id();
        if current != user_id {
            debug!(resolved_for = ?user_id, current = ?current, "Session changed during role resolution, discarding");
            return Ok(None);
        }

        let mut state = self.state.write();
        if ticket < state.applied {
            debug!(user_id = ?user_id, ticket, applied = state.applied, "Older role resolution finished late, discarding");
            return Ok(state.snapshot.role.clone());
        }
        state.applied = ticket;
        state.snapshot.loading = ticket < state.issued;

        match result {
            Ok(resolution) => {
                let snapshot = &mut state.snapshot;
                snapshot.role = resolution.as_ref().map(|r| r.role.clone());
                snapshot.source = resolution.as_ref().map(|r| r.source);
                snapshot.resolved_at = Some(resolution.as_ref().map_or_else(Utc::now, |r| r.resolved_at));
                snapshot.error = None;
                Ok(snapshot.role.clone())
            }
            Err(e) => {
                warn!(user_id = ?user_id, error = %e, "Role resolution failed");
                let snapshot = &mut state.snapshot;
                snapshot.role = None;
                snapshot.source = None;
                snapshot.resolved_at = None;
                snapshot.error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Role of the current session, refreshed first when missing or expired
    pub async fn current_role(&self) -> Result<Option<Role>, AuthzError> {
        let snapshot = self.snapshot();
        if snapshot.user_id.is_some() && (snapshot.resolved_at.is_none() || snapshot.loading) {
            return self.refresh().await;
        }
        Ok(snapshot.role)
    }

    /// Role state for the current session
    ///
    /// A role past the freshness window reads as absent and loading.
    pub fn snapshot(&self) -> RoleSnapshot {
        let session = self.store.snapshot();
        let current = session.user_id();
        let state = self.state.read();

        if state.snapshot.user_id != current || current.is_none() {
            return RoleSnapshot::pending(current.clone(), session.loading || current.is_some());
        }

        if state.snapshot.is_expired(self.resolver.config().cache_ttl) {
            debug!(user_id = ?current, "Resolved role expired, revalidation due");
            return RoleSnapshot::pending(current, true);
        }

        let mut snapshot = state.snapshot.clone();
        snapshot.loading = snapshot.loading || session.loading;
        snapshot
    }

    /// Role of the current session, if resolved and fresh
    pub fn role(&self) -> Option<Role> {
        self.snapshot().role
    }

    /// Whether the current user may open `section`
    pub fn can_access(&self, section: &str) -> bool {
        gate::can_access(self.role().as_ref(), section)
    }

    /// Sections the current user may see, in menu order
    pub fn visible_sections(&self) -> Vec<SectionDescriptor> {
        gate::visible_sections(self.role().as_ref())
    }

    /// Section to show for a requested one
    pub fn select_section(&self, requested: &str) -> SectionSelection {
        gate::select_section(self.role().as_ref(), requested)
    }
}
