//! Shared types for the memberhub platform

pub mod session;
pub mod events;

// Re-export commonly used types
pub use session::{Session, User, UserId, MEMBER_NUMBER_KEY};
pub use events::{AuthEvent, AuthStateChange};
