//! memberhub console
//!
//! Command-line front end that runs the session lifecycle and role gate
//! against a backend fixture.

pub mod config;
pub mod console;
pub mod fixture;

pub use config::ConsoleConfig;
pub use console::{CheckReport, Console, StatusReport};
pub use fixture::{load_events, BackendFixture};
