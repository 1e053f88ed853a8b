//! Steps of the role fallback chain
//!
//! Each step answers "does this source grant a role to the user?" with a
//! role, nothing, or a lookup error. The resolver runs them in order and the
//! first role wins.

use async_trait::async_trait;
use memberhub_core::traits::{LookupResult, RoleDirectory};
use memberhub_core::User;
use tracing::debug;

use super::types::{Role, RoleSource};

/// One step of the fallback chain
#[async_trait]
pub trait ResolverStep: Send + Sync {
    /// Source reported when this step produces the role
    fn source(&self) -> RoleSource;

    /// Role granted by this step, if any
    async fn resolve(&self, user: &User, directory: &dyn RoleDirectory) -> LookupResult<Option<Role>>;
}

/// Explicit assignment in the role table
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectAssignment;

#[async_trait]
impl ResolverStep for DirectAssignment {
    fn source(&self) -> RoleSource {
        RoleSource::DirectAssignment
    }

    async fn resolve(&self, user: &User, directory: &dyn RoleDirectory) -> LookupResult<Option<Role>> {
        let row = directory.role_assignment(&user.id).await?;

        Ok(row
            .filter(|row| !row.role.trim().is_empty())
            .map(|row| Role::parse(&row.role)))
    }
}

/// Collector registry keyed by the user's member number
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectorRegistry;

#[async_trait]
impl ResolverStep for CollectorRegistry {
    fn source(&self) -> RoleSource {
        RoleSource::CollectorRegistry
    }

    async fn resolve(&self, user: &User, directory: &dyn RoleDirectory) -> LookupResult<Option<Role>> {
        let Some(member_number) = user.member_number() else {
            debug!(user_id = %user.id, "No member number in metadata, skipping collector lookup");
            return Ok(None);
        };

        let row = directory.collector_by_member_number(&member_number).await?;
        Ok(row.map(|_| Role::Collector))
    }
}

/// Member registry keyed by auth user id
#[derive(Debug, Clone, Copy, Default)]
pub struct MemberRegistry;

#[async_trait]
impl ResolverStep for MemberRegistry {
    fn source(&self) -> RoleSource {
        RoleSource::MemberRegistry
    }

    async fn resolve(&self, user: &User, directory: &dyn RoleDirectory) -> LookupResult<Option<Role>> {
        let row = directory.member_by_user_id(&user.id).await?;
        Ok(row.map(|_| Role::Member))
    }
}

/// Standard chain: role table, then collector registry, then member registry
pub fn default_chain() -> Vec<Box<dyn ResolverStep>> {
    vec![
        Box::new(DirectAssignment),
        Box::new(CollectorRegistry),
        Box::new(MemberRegistry),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use memberhub_core::memory::InMemoryDirectory;
    use memberhub_core::traits::COLLECTORS_TABLE;

    #[tokio::test]
    async fn test_direct_assignment_ignores_blank_role() {
        let directory = InMemoryDirectory::new().with_role("u1", "  ");
        let role = DirectAssignment
            .resolve(&User::new("u1"), &directory)
            .await
            .unwrap();
        assert!(role.is_none());
    }

    #[tokio::test]
    async fn test_collector_step_skips_lookup_without_member_number() {
        let directory = InMemoryDirectory::new().with_collector("M1", "North Ward");
        let role = CollectorRegistry
            .resolve(&User::new("u1"), &directory)
            .await
            .unwrap();

        assert!(role.is_none());
        assert_eq!(directory.lookups(COLLECTORS_TABLE), 0);
    }

    #[tokio::test]
    async fn test_collector_step_matches_member_number() {
        let directory = InMemoryDirectory::new().with_collector("M1", "North Ward");
        let user = User::new("u1").with_member_number("M1");

        let role = CollectorRegistry.resolve(&user, &directory).await.unwrap();
        assert_eq!(role, Some(Role::Collector));
    }

    #[tokio::test]
    async fn test_member_step() {
        let directory = InMemoryDirectory::new().with_member("m-1", "u1");

        let found = MemberRegistry.resolve(&User::new("u1"), &directory).await.unwrap();
        let missing = MemberRegistry.resolve(&User::new("u2"), &directory).await.unwrap();

        assert_eq!(found, Some(Role::Member));
        assert_eq!(missing, None);
    }

    #[test]
    fn test_default_chain_order() {
        let sources: Vec<_> = default_chain().iter().map(|s| s.source()).collect();
        assert_eq!(
            sources,
            vec![
                RoleSource::DirectAssignment,
                RoleSource::CollectorRegistry,
                RoleSource::MemberRegistry,
            ]
        );
    }
}
