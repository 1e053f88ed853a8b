//! Shared scenario wiring for the end-to-end tests
//!
//! A [`Scenario`] assembles the session store, cache coordinator, role
//! resolver and role access over the in-memory provider and tables, the way
//! the console application does.

use memberhub_authz::{ResolverConfig, RoleResolver};
use memberhub_core::memory::{InMemoryDirectory, InMemoryGateway};
use memberhub_core::{Session, User};
use memberhub_session::{CacheCoordinator, RecordingShell, RoleAccess, SessionConfig, SessionStore};
use std::sync::Arc;

pub struct Scenario {
    pub gateway: InMemoryGateway,
    pub directory: InMemoryDirectory,
    pub shell: RecordingShell,
    pub caches: Arc<CacheCoordinator>,
    pub store: Arc<SessionStore>,
    pub access: RoleAccess,
}

impl Scenario {
    pub fn new(gateway: InMemoryGateway, directory: InMemoryDirectory) -> Self {
        Self::with_config(gateway, directory, ResolverConfig::default())
    }

    pub fn with_config(
        gateway: InMemoryGateway,
        directory: InMemoryDirectory,
        config: ResolverConfig,
    ) -> Self {
        let resolver = RoleResolver::with_config(Arc::new(directory.clone()), config);
        let caches = Arc::new(CacheCoordinator::with_role_resolver(resolver.clone()));
        let shell = RecordingShell::new();
        let store = SessionStore::new(
            Arc::new(gateway.clone()),
            caches.clone(),
            Arc::new(shell.clone()),
            Arc::new(shell.clone()),
            SessionConfig::default(),
        );
        let access = RoleAccess::new(store.clone(), resolver);

        Self {
            gateway,
            directory,
            shell,
            caches,
            store,
            access,
        }
    }
}

/// Session for `user_id`, optionally carrying a member number
pub fn session_for(user_id: &str, member_number: Option<&str>) -> Session {
    let mut user = User::new(user_id).with_email(format!("{}@example.org", user_id.to_lowercase()));
    if let Some(number) = member_number {
        user = user.with_member_number(number);
    }
    Session::new(format!("access-{}", user_id), user).with_refresh_token(format!("refresh-{}", user_id))
}

/// Let spawned listener tasks drain their queues
pub async fn settle() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}
