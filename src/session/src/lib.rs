//! # memberhub session
//!
//! Session lifecycle for the membership console.
//!
//! - **Session store**: the verified session and loading flag, fed by
//!   initialization, provider notifications and on-demand revalidation
//! - **Cache coordinator**: identity-scoped query cache with full reset
//! - **Role access**: the resolved role, trusted only for the session it was
//!   resolved for
//! - **Route guard**: what to render for a path

pub mod access;
pub mod cache;
pub mod classify;
pub mod config;
pub mod error;
pub mod routes;
pub mod shell;
pub mod store;
pub mod transition;

// Re-export commonly used types
pub use access::{RoleAccess, RoleSnapshot};
pub use cache::{CacheCoordinator, QueryKey};
pub use classify::AuthFailure;
pub use config::SessionConfig;
pub use error::{Result, SessionError};
pub use routes::{guard, RouteDecision};
pub use shell::{Navigator, Notice, NoticeLevel, Notifier, RecordingShell};
pub use store::{SessionSnapshot, SessionStore};
