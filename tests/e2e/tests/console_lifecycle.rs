//! End-to-end session lifecycle scenarios

use memberhub_authz::{gate, Role, RoleSource};
use memberhub_core::memory::{InMemoryDirectory, InMemoryGateway, Verification};
use memberhub_core::traits::USER_ROLES_TABLE;
use memberhub_core::{AuthEvent, AuthStateChange, GatewayError, UserId};
use memberhub_e2e_tests::{session_for, settle, Scenario};
use memberhub_session::{guard, QueryKey, RouteDecision};
use serde_json::json;
use serial_test::serial;
use std::sync::Arc;
use tracing_test::traced_test;

#[tokio::test]
async fn test_sign_in_switch_user_and_sign_out() {
    let directory = InMemoryDirectory::new()
        .with_collector("M1", "North")
        .with_role("U2", "admin");
    let s = Scenario::new(InMemoryGateway::new(), directory);

    // Nobody signed in yet
    s.store.start().await;
    let config = s.store.config().clone();
    assert_eq!(
        guard(&s.store.snapshot(), "/", &config),
        RouteDecision::Redirect("/login".to_string())
    );

    // U1 signs in and is a collector through member number M1
    s.gateway.set_session(Some(session_for("U1", Some("M1"))));
    s.gateway.emit(AuthEvent::SignedIn, Some(session_for("U1", Some("M1"))));
    settle().await;

    assert_eq!(s.access.refresh().await.unwrap(), Some(Role::Collector));
    assert_eq!(s.access.snapshot().source, Some(RoleSource::CollectorRegistry));
    assert!(s.access.can_access(gate::USERS));
    assert_eq!(guard(&s.store.snapshot(), "/login", &config), RouteDecision::Redirect("/".to_string()));

    let members = QueryKey::new(["members", "search:", "role:collector"]);
    let fetched = s
        .caches
        .fetch(members.clone(), || async { Ok::<_, String>(json!(["Alice", "Bob"])) })
        .await
        .unwrap();
    assert_eq!(fetched, json!(["Alice", "Bob"]));

    // U2 signs in on the same console; nothing of U1 survives
    s.gateway.set_session(Some(session_for("U2", None)));
    s.gateway.emit(AuthEvent::SignedIn, Some(session_for("U2", None)));
    settle().await;

    assert_eq!(s.store.snapshot().user_id(), Some(UserId::new("U2")));
    assert!(s.caches.get(&members).is_none());
    assert_eq!(s.access.role(), None);
    assert_eq!(s.access.refresh().await.unwrap(), Some(Role::Admin));
    assert!(s.access.can_access(gate::SETTINGS));

    // U2 signs out
    s.store.sign_out().await.unwrap();
    settle().await;

    assert!(s.store.session().is_none());
    assert_eq!(s.access.role(), None);
    assert!(s.caches.is_empty());
    assert_eq!(s.shell.navigations(), vec!["/login".to_string()]);
    assert_eq!(s.shell.notice_titles(), vec!["Logged out successfully".to_string()]);
    assert!(!s.store.is_mounted());
}

#[tokio::test]
#[traced_test]
async fn test_refresh_token_revoked_mid_session() {
    let gateway = InMemoryGateway::with_session(session_for("U1", None));
    let s = Scenario::new(gateway, InMemoryDirectory::new().with_role("U1", "member"));
    s.store.start().await;
    s.access.refresh().await.unwrap();
    s.caches.insert(QueryKey::new(["dashboard"]), json!({"payments": 4}));

    s.gateway.set_verification(Verification::Fail(
        GatewayError::new("Invalid Refresh Token: Refresh Token Not Found")
            .with_code("refresh_token_not_found")
            .with_status(400),
    ));
    s.store
        .handle_notification(AuthStateChange::new(
            AuthEvent::TokenRefreshed,
            Some(session_for("U1", None)),
        ))
        .await;
    settle().await;

    assert!(s.store.session().is_none());
    assert!(s.caches.is_empty());
    assert_eq!(s.gateway.sign_out_calls(), 1);
    assert_eq!(s.shell.notice_titles(), vec!["Session expired".to_string()]);
    assert_eq!(s.shell.navigation_count(), 1);
    assert!(!s.access.can_access(gate::DASHBOARD));
    assert!(logs_contain("Auth failure, ending session"));
}

#[tokio::test]
async fn test_role_lookup_outage_never_defaults() {
    let directory = InMemoryDirectory::new().with_role("U1", "admin");
    directory.fail_table(USER_ROLES_TABLE, "upstream timeout", None);
    let s = Scenario::new(InMemoryGateway::with_session(session_for("U1", None)), directory);
    s.store.start().await;

    assert!(s.access.refresh().await.is_err());
    assert!(s.access.snapshot().error.is_some());
    for section in gate::NAVIGATION.iter().map(|d| d.id) {
        assert!(!s.access.can_access(section), "{} granted during outage", section);
    }

    s.directory.heal_table(USER_ROLES_TABLE);
    assert_eq!(s.access.refresh().await.unwrap(), Some(Role::Admin));
    assert!(s.access.snapshot().error.is_none());
}

#[tokio::test]
async fn test_role_served_from_cache_within_window() {
    let directory = InMemoryDirectory::new().with_role("U1", "collector");
    let s = Scenario::new(InMemoryGateway::with_session(session_for("U1", None)), directory);
    s.store.start().await;

    s.access.refresh().await.unwrap();
    let lookups = s.directory.total_lookups();
    for _ in 0..5 {
        assert_eq!(s.access.refresh().await.unwrap(), Some(Role::Collector));
    }
    assert_eq!(s.directory.total_lookups(), lookups);

    // Same user, new token: identity unchanged, cache kept
    s.store
        .handle_notification(AuthStateChange::new(
            AuthEvent::TokenRefreshed,
            Some(session_for("U1", None)),
        ))
        .await;
    s.access.refresh().await.unwrap();
    assert_eq!(s.directory.total_lookups(), lookups);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn test_concurrent_sources_converge() {
    let gateway = InMemoryGateway::with_session(session_for("U1", None));
    let s = Arc::new(Scenario::new(gateway, InMemoryDirectory::new()));
    s.store.subscribe();

    let mut tasks = Vec::new();
    tasks.push(tokio::spawn({
        let s = s.clone();
        async move { s.store.initialize().await }
    }));
    for _ in 0..8 {
        tasks.push(tokio::spawn({
            let s = s.clone();
            async move { s.store.revalidate().await }
        }));
    }
    for _ in 0..8 {
        s.gateway.emit(AuthEvent::TokenRefreshed, Some(session_for("U1", None)));
    }
    futures::future::join_all(tasks).await;

    let mut rx = s.store.watch();
    tokio::time::timeout(std::time::Duration::from_secs(5), rx.wait_for(|state| !state.loading))
        .await
        .expect("initialization finished")
        .expect("store alive");

    assert_eq!(s.store.snapshot().user_id(), Some(UserId::new("U1")));
    assert_eq!(s.shell.navigation_count(), 0);
    assert!(s.store.is_mounted());
}

#[tokio::test]
async fn test_user_deleted_while_role_resolving() {
    let s = Scenario::new(
        InMemoryGateway::with_session(session_for("U1", None)),
        InMemoryDirectory::new().with_role("U1", "admin"),
    );
    s.store.start().await;

    let (role, _) = tokio::join!(s.access.refresh(), async {
        s.store
            .handle_notification(AuthStateChange::new(AuthEvent::UserDeleted, None))
            .await;
    });

    // Whatever the interleaving, an admin role is not usable afterwards
    assert!(role.is_ok());
    assert_eq!(s.access.role(), None);
    assert!(!s.access.can_access(gate::SETTINGS));
    assert_eq!(s.shell.navigation_count(), 1);
}
