//! Role and resolution types

use chrono::{DateTime, Utc};
use memberhub_core::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Authorization role of a signed-in user
///
/// Values read from the role table that are none of the known roles are
/// kept verbatim as `Unrecognized`; the access gate denies them everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Member,
    Collector,
    Admin,
    Unrecognized(String),
}

impl Role {
    /// Interpret a stored role value
    ///
    /// Only the exact lowercase names are known roles. Anything else,
    /// including `"ADMIN"` or `" admin"`, is kept verbatim as `Unrecognized`.
    pub fn parse(value: &str) -> Self {
        match value {
            "member" => Role::Member,
            "collector" => Role::Collector,
            "admin" => Role::Admin,
            other => Role::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::Member => "member",
            Role::Collector => "collector",
            Role::Admin => "admin",
            Role::Unrecognized(value) => value,
        }
    }

    /// Whether this is one of the known roles
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Role::Unrecognized(_))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Role::parse(&value)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

/// Which step of the fallback chain produced a role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleSource {
    DirectAssignment,
    CollectorRegistry,
    MemberRegistry,
    /// No step matched; the configured default applied
    Default,
}

impl RoleSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleSource::DirectAssignment => "direct_assignment",
            RoleSource::CollectorRegistry => "collector_registry",
            RoleSource::MemberRegistry => "member_registry",
            RoleSource::Default => "default",
        }
    }
}

impl fmt::Display for RoleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of resolving one user's role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// User the role was resolved for
    pub user_id: UserId,

    /// Resolved role
    pub role: Role,

    /// Step that produced the role
    pub source: RoleSource,

    /// When the chain ran
    pub resolved_at: DateTime<Utc>,
}

impl Resolution {
    pub fn new(user_id: UserId, role: Role, source: RoleSource) -> Self {
        Self {
            user_id,
            role,
            source,
            resolved_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_roles() {
        assert_eq!(Role::parse("admin"), Role::Admin);
        assert_eq!(Role::parse("collector"), Role::Collector);
        assert_eq!(Role::parse("member"), Role::Member);
    }

    #[test]
    fn test_parse_is_exact() {
        for value in ["ADMIN", "Admin", " admin", "admin ", " Collector ", "MEMBER"] {
            let role = Role::parse(value);
            assert_eq!(role, Role::Unrecognized(value.to_string()));
            assert!(!role.is_recognized());
        }
    }

    #[test]
    fn test_parse_unknown_role_is_kept() {
        let role = Role::parse("treasurer");
        assert_eq!(role, Role::Unrecognized("treasurer".to_string()));
        assert!(!role.is_recognized());
        assert_eq!(role.to_string(), "treasurer");
    }

    #[test]
    fn test_role_serde_uses_plain_strings() {
        let json = serde_json::to_string(&Role::Collector).unwrap();
        assert_eq!(json, "\"collector\"");

        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::Admin);
    }
}
