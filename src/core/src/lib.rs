//! # memberhub core
//!
//! Shared types, collaborator traits, and error handling for the memberhub
//! session and authorization crates.

pub mod types;
pub mod traits;
pub mod error;
pub mod memory;

// Re-export commonly used types
pub use error::{CoreError, GatewayError, LookupError, Result};
pub use types::{AuthEvent, AuthStateChange, Session, User, UserId};
pub use traits::{IdentityGateway, RoleDirectory};
