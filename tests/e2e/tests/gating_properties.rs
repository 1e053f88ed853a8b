//! Properties of role gating across the whole lifecycle

use memberhub_authz::{gate, Role};
use memberhub_core::memory::{InMemoryDirectory, InMemoryGateway};
use memberhub_core::{AuthEvent, AuthStateChange};
use memberhub_e2e_tests::{session_for, Scenario};
use proptest::prelude::*;

fn arb_role_row() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some("admin".to_string())),
        Just(Some("collector".to_string())),
        Just(Some("member".to_string())),
        Just(Some("  Admin ".to_string())),
        Just(Some("superuser".to_string())),
        Just(Some(String::new())),
    ]
}

fn arb_section() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(gate::DASHBOARD.to_string()),
        Just(gate::USERS.to_string()),
        Just(gate::COLLECTORS.to_string()),
        Just(gate::AUDIT.to_string()),
        Just(gate::SETTINGS.to_string()),
        "[a-z_]{1,10}",
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_access_follows_resolved_role(
        row in arb_role_row(),
        collector in any::<bool>(),
        section in arb_section()
    ) {
        let (role, allowed) = tokio_test::block_on(async {
            let mut directory = InMemoryDirectory::new();
            if let Some(row) = &row {
                directory = directory.with_role("U1", row.clone());
            }
            if collector {
                directory = directory.with_collector("M1", "North");
            }
            let s = Scenario::new(
                InMemoryGateway::with_session(session_for("U1", Some("M1"))),
                directory,
            );
            s.store.start().await;
            let role = s.access.refresh().await.unwrap();
            (role, s.access.can_access(&section))
        });

        prop_assert!(role.is_some());
        prop_assert_eq!(allowed, gate::can_access(role.as_ref(), &section));
        if role == Some(Role::Admin) {
            prop_assert!(allowed);
        }
        if matches!(role, Some(Role::Unrecognized(_))) {
            prop_assert!(!allowed);
        }
        if row.as_deref() == Some("  Admin ") {
            prop_assert_eq!(role, Some(Role::Unrecognized("  Admin ".to_string())));
            prop_assert!(!allowed);
        }
    }

    #[test]
    fn prop_nothing_accessible_after_sign_out(
        row in arb_role_row(),
        section in arb_section()
    ) {
        let allowed = tokio_test::block_on(async {
            let mut directory = InMemoryDirectory::new();
            if let Some(row) = &row {
                directory = directory.with_role("U1", row.clone());
            }
            let s = Scenario::new(InMemoryGateway::with_session(session_for("U1", None)), directory);
            s.store.start().await;
            let _ = s.access.refresh().await;
            s.store
                .handle_notification(AuthStateChange::new(AuthEvent::SignedOut, None))
                .await;
            s.access.can_access(&section)
        });

        prop_assert!(!allowed);
    }
}
