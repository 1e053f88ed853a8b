//! In-memory collaborators
//!
//! Scriptable stand-ins for the identity provider and the backend tables,
//! used by tests and by the console binary when running against a fixture.

pub mod gateway;
pub mod directory;

pub use gateway::{InMemoryGateway, Verification};
pub use directory::{DirectoryFixture, InMemoryDirectory};
