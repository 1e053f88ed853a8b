//! Console configuration loading and validation

use anyhow::{Context, Result};
use memberhub_authz::ResolverConfig;
use memberhub_session::SessionConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Complete console configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConsoleConfig {
    pub console: ConsoleSection,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub roles: RolesSection,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConsoleSection {
    /// Backend fixture loaded into the in-memory collaborators
    pub fixture: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RolesSection {
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_max_cache_entries")]
    pub max_cache_entries: usize,
    #[serde(default = "default_lookup_retries")]
    pub lookup_retries: u32,
    #[serde(default = "default_true")]
    pub default_to_member: bool,
}

impl Default for RolesSection {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl(),
            max_cache_entries: default_max_cache_entries(),
            lookup_retries: default_lookup_retries(),
            default_to_member: default_true(),
        }
    }
}

// Default value functions
fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_cache_ttl() -> u64 { 300 }
fn default_max_cache_entries() -> usize { 10_000 }
fn default_lookup_retries() -> u32 { 1 }

impl ConsoleConfig {
    /// Load configuration from TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .context("Failed to read configuration file")?;

        Self::parse(&contents)
    }

    /// Parse configuration from TOML text
    pub fn parse(contents: &str) -> Result<Self> {
        let config: ConsoleConfig = toml::from_str(contents)
            .context("Failed to parse configuration file")?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.console.fixture.as_os_str().is_empty() {
            anyhow::bail!("console.fixture must name a backend fixture file");
        }

        if self.roles.lookup_retries > 5 {
            anyhow::bail!("roles.lookup_retries must be at most 5");
        }

        self.session
            .validate()
            .context("Invalid [session] section")?;
        self.resolver_config()
            .validate()
            .context("Invalid [roles] section")?;

        Ok(())
    }

    /// Role resolver settings
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            cache_ttl: Duration::from_secs(self.roles.cache_ttl_secs),
            max_cache_entries: self.roles.max_cache_entries,
            lookup_retries: self.roles.lookup_retries,
            default_to_member: self.roles.default_to_member,
        }
    }

    /// Fixture path, relative paths resolved against `base`
    pub fn fixture_path(&self, base: &Path) -> PathBuf {
        if self.console.fixture.is_absolute() {
            self.console.fixture.clone()
        } else {
            base.join(&self.console.fixture)
        }
    }
}
