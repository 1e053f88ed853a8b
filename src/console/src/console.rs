//! Console application wiring
//!
//! Builds the session store, cache coordinator and role access over the
//! in-memory collaborators and answers the binary's subcommands.

use memberhub_authz::{gate, Role, RoleResolver, RoleSource, SectionDescriptor};
use memberhub_core::memory::InMemoryGateway;
use memberhub_core::{AuthStateChange, UserId};
use memberhub_session::{
    guard, CacheCoordinator, Notice, RecordingShell, RoleAccess, RouteDecision, SessionStore,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::ConsoleConfig;
use crate::fixture::BackendFixture;

/// Session and role state after a command
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub user_id: Option<UserId>,
    pub email: Option<String>,
    pub loading: bool,
    pub role: Option<Role>,
    pub role_source: Option<RoleSource>,
    pub role_error: Option<String>,
    pub sections: Vec<SectionDescriptor>,
    /// What the home route would show
    pub home: RouteDecision,
    pub navigations: Vec<String>,
    pub notices: Vec<Notice>,
    pub cache_resets: u64,
    pub mounted: bool,
}

/// Access decision for one section
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub section: String,
    pub role: Option<Role>,
    pub allowed: bool,
    /// Section the console would actually show
    pub active: String,
    /// Whether an "Access Restricted" notice is due
    pub restricted: bool,
}

pub struct Console {
    gateway: InMemoryGateway,
    shell: RecordingShell,
    caches: Arc<CacheCoordinator>,
    store: Arc<SessionStore>,
    access: RoleAccess,
}

impl Console {
    pub fn new(config: &ConsoleConfig, fixture: &BackendFixture) -> Self {
        let gateway = fixture.gateway();
        let resolver = RoleResolver::with_config(
            Arc::new(fixture.directory()),
            config.resolver_config(),
        );
        let caches = Arc::new(CacheCoordinator::with_role_resolver(resolver.clone()));
        let shell = RecordingShell::new();

        let store = SessionStore::new(
            Arc::new(gateway.clone()),
            caches.clone(),
            Arc::new(shell.clone()),
            Arc::new(shell.clone()),
            config.session.clone(),
        );
        let access = RoleAccess::new(store.clone(), resolver);

        Self {
            gateway,
            shell,
            caches,
            store,
            access,
        }
    }

    /// Mount the store and resolve the role of whoever is signed in
    pub async fn start(&self) {
        self.store.start().await;
        self.refresh_role().await;
    }

    pub async fn status(&self) -> StatusReport {
        self.start().await;
        self.report()
    }

    pub async fn check(&self, section: &str) -> CheckReport {
        self.start().await;

        let selection = self.access.select_section(section);
        CheckReport {
            section: section.to_string(),
            role: self.access.role(),
            allowed: self.access.can_access(section),
            active: selection.active().to_string(),
            restricted: selection.is_restricted(),
        }
    }

    /// Feed a notification sequence through the store
    ///
    /// The provider's stored session follows each non-terminal notification,
    /// the way a real provider persists what it announces.
    pub async fn replay(&self, changes: Vec<AuthStateChange>) -> StatusReport {
        self.start().await;

        for change in changes {
            if !self.store.is_mounted() {
                debug!(event = %change.event, "Store torn down, ignoring remaining notifications");
                break;
            }
            if !change.event.is_terminal() {
                self.gateway.set_session(change.session.clone());
            }
            self.store.handle_notification(change).await;
        }

        self.refresh_role().await;
        self.report()
    }

    /// User-initiated sign-out
    pub async fn sign_out(&self) -> anyhow::Result<StatusReport> {
        self.start().await;
        self.store.sign_out().await?;
        tokio::task::yield_now().await;
        Ok(self.report())
    }

    async fn refresh_role(&self) {
        if !self.store.is_mounted() {
            return;
        }
        match self.access.refresh().await {
            Ok(role) => info!(role = ?role, "Role resolved"),
            Err(e) => warn!(error = %e, "Role could not be resolved"),
        }
    }

    fn report(&self) -> StatusReport {
        let session = self.store.snapshot();
        let role = self.access.snapshot();

        StatusReport {
            user_id: session.user_id(),
            email: session
                .session
                .as_ref()
                .and_then(|s| s.user.as_ref())
                .and_then(|u| u.email.clone()),
            loading: session.loading,
            sections: gate::visible_sections(role.role.as_ref()),
            role: role.role,
            role_source: role.source,
            role_error: role.error.map(|e| e.to_string()),
            home: guard(&session, &self.store.config().home_route, self.store.config()),
            navigations: self.shell.navigations(),
            notices: self.shell.notices(),
            cache_resets: self.caches.reset_count(),
            mounted: self.store.is_mounted(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memberhub_core::AuthEvent;

    fn config() -> ConsoleConfig {
        ConsoleConfig::parse("[console]\nfixture = \"backend.json\"\n").unwrap()
    }

    fn fixture(json: &str) -> BackendFixture {
        serde_json::from_str(json).unwrap()
    }

    const COLLECTOR: &str = r#"{
        "session": {
            "access_token": "token-u1",
            "user": { "id": "U1", "metadata": { "member_number": "M1" } }
        },
        "directory": { "collectors": [ { "member_number": "M1", "name": "North" } ] }
    }"#;

    #[tokio::test]
    async fn test_status_for_collector() {
        let console = Console::new(&config(), &fixture(COLLECTOR));
        let report = console.status().await;

        assert_eq!(report.user_id, Some(UserId::new("U1")));
        assert_eq!(report.role, Some(Role::Collector));
        assert_eq!(report.role_source, Some(RoleSource::CollectorRegistry));
        assert_eq!(
            report.sections.iter().map(|s| s.label).collect::<Vec<_>>(),
            vec!["Dashboard", "Users"]
        );
        assert_eq!(report.home, RouteDecision::Render);
        assert!(report.navigations.is_empty());
    }

    #[tokio::test]
    async fn test_check_restricted_section() {
        let console = Console::new(&config(), &fixture(COLLECTOR));
        let report = console.check(gate::SETTINGS).await;

        assert!(!report.allowed);
        assert!(report.restricted);
        assert_eq!(report.active, gate::DASHBOARD);
    }

    #[tokio::test]
    async fn test_status_without_session() {
        let console = Console::new(&config(), &BackendFixture::default());
        let report = console.status().await;

        assert_eq!(report.user_id, None);
        assert_eq!(report.role, None);
        assert!(report.sections.is_empty());
        assert_eq!(report.home, RouteDecision::Redirect("/login".to_string()));
    }

    #[tokio::test]
    async fn test_expired_session_is_signed_out() {
        let console = Console::new(
            &config(),
            &fixture(
                r#"{
                    "session": { "access_token": "t", "user": { "id": "U1" } },
                    "verification": { "kind": "error", "error": { "message": "JWT expired" } }
                }"#,
            ),
        );
        let report = console.status().await;

        assert_eq!(report.user_id, None);
        assert_eq!(report.navigations, vec!["/login".to_string()]);
        assert_eq!(report.notices[0].title, "Session expired");
        assert!(!report.mounted);
    }

    #[tokio::test]
    async fn test_replay_ends_signed_out() {
        let console = Console::new(&config(), &fixture(COLLECTOR));
        let refreshed = fixture(COLLECTOR).session;

        let report = console
            .replay(vec![
                AuthStateChange::new(AuthEvent::TokenRefreshed, refreshed),
                AuthStateChange::new(AuthEvent::SignedOut, None),
            ])
            .await;

        assert_eq!(report.user_id, None);
        assert_eq!(report.role, None);
        assert_eq!(report.navigations.len(), 1);
        assert!(report.cache_resets >= 1);
    }

    #[tokio::test]
    async fn test_sign_out_reports_notice() {
        let console = Console::new(&config(), &fixture(COLLECTOR));
        let report = console.sign_out().await.unwrap();

        assert_eq!(report.notices[0].title, "Logged out successfully");
    }
}
