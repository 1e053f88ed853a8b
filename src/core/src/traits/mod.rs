//! Shared traits for the external collaborators

pub mod gateway;
pub mod directory;

// Re-export commonly used traits
pub use gateway::{AuthStateSubscription, GatewayResult, IdentityGateway, Subscription};
pub use directory::{
    CollectorRecord, LookupResult, MemberRecord, RoleAssignment, RoleDirectory,
    COLLECTORS_TABLE, MEMBERS_TABLE, USER_ROLES_TABLE,
};
