//! Backend lookup tables used for role resolution

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LookupError;
use crate::types::UserId;

/// Explicit role assignments keyed by user id
pub const USER_ROLES_TABLE: &str = "user_roles";

/// Collector registry keyed by member number
pub const COLLECTORS_TABLE: &str = "members_collectors";

/// Member registry keyed by auth user id
pub const MEMBERS_TABLE: &str = "members";

pub type LookupResult<T> = std::result::Result<T, LookupError>;

/// Row of the role assignment table
///
/// The role is kept as stored; interpretation belongs to the authorization
/// layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub user_id: UserId,
    pub role: String,
}

/// Row of the collector registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorRecord {
    pub member_number: String,
    pub name: String,
}

/// Row of the member registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    pub id: String,
    pub auth_user_id: UserId,
    #[serde(default)]
    pub member_number: Option<String>,
}

/// Single-row-or-absent lookups against the backend tables
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    /// Role assignment for a user
    async fn role_assignment(&self, user_id: &UserId) -> LookupResult<Option<RoleAssignment>>;

    /// Collector registered under a member number
    async fn collector_by_member_number(
        &self,
        member_number: &str,
    ) -> LookupResult<Option<CollectorRecord>>;

    /// Member linked to an auth user
    async fn member_by_user_id(&self, user_id: &UserId) -> LookupResult<Option<MemberRecord>>;
}
