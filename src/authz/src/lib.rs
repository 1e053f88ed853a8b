//! # memberhub authorization
//!
//! Role resolution and section access for the membership console.
//!
//! - **Role resolution** through an ordered fallback chain over the backend
//!   tables, with a per-user freshness window
//! - **Access gate**: pure (role, section) → allow/deny
//!
//! ## Example
//!
//! ```rust
//! use memberhub_authz::{gate, Role};
//!
//! assert!(gate::can_access(Some(&Role::Collector), gate::USERS));
//! assert!(!gate::can_access(Some(&Role::Member), gate::USERS));
//! assert!(!gate::can_access(None, gate::DASHBOARD));
//! ```

pub mod error;
pub mod gate;
pub mod roles;

// Re-export commonly used types
pub use error::{AuthzError, Result};
pub use gate::{can_access, select_section, visible_sections, SectionDescriptor, SectionSelection};
pub use roles::{Resolution, ResolverConfig, Role, RoleResolver, RoleSource};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
