//! Role resolution
//!
//! Resolves a signed-in user to an authorization role by walking an ordered
//! fallback chain against the backend tables:
//!
//! 1. explicit assignment in the role table
//! 2. collector registry, keyed by the user's member number
//! 3. member registry, keyed by the user id
//! 4. `member` by default
//!
//! The first step that yields a role wins. Lookup failures are returned as
//! errors, never mapped to the default.
//!
//! # Example
//!
//! ```rust
//! use memberhub_authz::roles::{Role, RoleResolver};
//! use memberhub_core::memory::InMemoryDirectory;
//! use memberhub_core::{Session, User};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let directory = InMemoryDirectory::new().with_collector("M1", "North Ward");
//! let resolver = RoleResolver::new(Arc::new(directory));
//!
//! let session = Session::new("token", User::new("u1").with_member_number("M1"));
//! let role = resolver.resolve_role(Some(&session)).await?;
//!
//! assert_eq!(role, Some(Role::Collector));
//! # Ok(())
//! # }
//! ```

pub mod types;
pub mod steps;
pub mod resolver;

pub use types::{Resolution, Role, RoleSource};
pub use steps::{default_chain, CollectorRegistry, DirectAssignment, MemberRegistry, ResolverStep};
pub use resolver::{CacheStats, ResolverConfig, RoleResolver};
