//! In-memory backend tables

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::LookupError;
use crate::traits::{
    CollectorRecord, LookupResult, MemberRecord, RoleAssignment, RoleDirectory,
    COLLECTORS_TABLE, MEMBERS_TABLE, USER_ROLES_TABLE,
};
use crate::types::UserId;

/// Serializable table contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryFixture {
    #[serde(default)]
    pub roles: Vec<RoleAssignment>,
    #[serde(default)]
    pub collectors: Vec<CollectorRecord>,
    #[serde(default)]
    pub members: Vec<MemberRecord>,
}

/// Injected failure for one table
#[derive(Debug, Clone)]
struct Failure {
    message: String,
    /// Remaining failing calls; `None` fails forever
    remaining: Option<usize>,
}

/// In-memory role directory with lookup counters and failure injection
#[derive(Clone, Default)]
pub struct InMemoryDirectory {
    roles: Arc<DashMap<UserId, RoleAssignment>>,
    collectors: Arc<DashMap<String, CollectorRecord>>,
    members: Arc<DashMap<UserId, MemberRecord>>,
    failures: Arc<DashMap<&'static str, Failure>>,
    lookups: Arc<DashMap<&'static str, usize>>,
}

impl InMemoryDirectory {
    /// Create empty tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Load tables from a fixture
    pub fn from_fixture(fixture: DirectoryFixture) -> Self {
        let directory = Self::new();
        for row in fixture.roles {
            directory.roles.insert(row.user_id.clone(), row);
        }
        for row in fixture.collectors {
            directory.collectors.insert(row.member_number.clone(), row);
        }
        for row in fixture.members {
            directory.members.insert(row.auth_user_id.clone(), row);
        }
        directory
    }

    /// Assign a role to a user
    pub fn with_role(self, user_id: impl Into<UserId>, role: impl Into<String>) -> Self {
        self.set_role(user_id, role);
        self
    }

    /// Register a collector under a member number
    pub fn with_collector(self, member_number: impl Into<String>, name: impl Into<String>) -> Self {
        let member_number = member_number.into();
        self.collectors.insert(
            member_number.clone(),
            CollectorRecord {
                member_number,
                name: name.into(),
            },
        );
        self
    }

    /// Register a member linked to an auth user
    pub fn with_member(self, id: impl Into<String>, user_id: impl Into<UserId>) -> Self {
        let auth_user_id = user_id.into();
        self.members.insert(
            auth_user_id.clone(),
            MemberRecord {
                id: id.into(),
                auth_user_id,
                member_number: None,
            },
        );
        self
    }

    /// Assign or replace a user's role
    pub fn set_role(&self, user_id: impl Into<UserId>, role: impl Into<String>) {
        let user_id = user_id.into();
        self.roles.insert(
            user_id.clone(),
            RoleAssignment {
                user_id,
                role: role.into(),
            },
        );
    }

    /// Remove a user's role assignment
    pub fn remove_role(&self, user_id: &UserId) {
        self.roles.remove(user_id);
    }

    /// Fail lookups on `table`, `times` calls or forever when `None`
    pub fn fail_table(&self, table: &'static str, message: impl Into<String>, times: Option<usize>) {
        self.failures.insert(
            table,
            Failure {
                message: message.into(),
                remaining: times,
            },
        );
    }

    /// Stop failing lookups on `table`
    pub fn heal_table(&self, table: &'static str) {
        self.failures.remove(table);
    }

    /// Number of lookups issued against `table`
    pub fn lookups(&self, table: &str) -> usize {
        self.lookups.get(table).map(|n| *n).unwrap_or(0)
    }

    /// Total lookups across all tables
    pub fn total_lookups(&self) -> usize {
        self.lookups.iter().map(|entry| *entry.value()).sum()
    }

    fn record(&self, table: &'static str) -> LookupResult<()> {
        *self.lookups.entry(table).or_insert(0) += 1;

        let mut exhausted = false;
        let outcome = match self.failures.get_mut(table) {
            Some(mut failure) => {
                let message = failure.message.clone();
                if let Some(remaining) = failure.remaining.as_mut() {
                    *remaining = remaining.saturating_sub(1);
                    exhausted = *remaining == 0;
                }
                Err(LookupError::new(table, message))
            }
            None => Ok(()),
        };

        if exhausted {
            self.failures.remove(table);
        }
        outcome
    }
}

#[async_trait]
impl RoleDirectory for InMemoryDirectory {
    async fn role_assignment(&self, user_id: &UserId) -> LookupResult<Option<RoleAssignment>> {
        self.record(USER_ROLES_TABLE)?;
        Ok(self.roles.get(user_id).map(|row| row.clone()))
    }

    async fn collector_by_member_number(
        &self,
        member_number: &str,
    ) -> LookupResult<Option<CollectorRecord>> {
        self.record(COLLECTORS_TABLE)?;
        Ok(self.collectors.get(member_number).map(|row| row.clone()))
    }

    async fn member_by_user_id(&self, user_id: &UserId) -> LookupResult<Option<MemberRecord>> {
        self.record(MEMBERS_TABLE)?;
        Ok(self.members.get(user_id).map(|row| row.clone()))
    }
}
