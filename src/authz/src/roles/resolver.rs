//! Role resolver with a per-user freshness window
//!
//! The resolver walks the fallback chain for a session's user and caches the
//! outcome keyed by user id. A cached entry is served only while fresh; once
//! the window passes the chain runs again, and a failure of that run is
//! returned to the caller instead of the stale value.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use memberhub_core::traits::RoleDirectory;
use memberhub_core::{Session, User, UserId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::steps::{default_chain, ResolverStep};
use super::types::{Resolution, Role, RoleSource};
use crate::error::{AuthzError, Result};

/// Resolver configuration
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Freshness window of a resolved role
    pub cache_ttl: Duration,

    /// Maximum number of cached users
    pub max_cache_entries: usize,

    /// Extra attempts for a failed lookup before the error surfaces
    pub lookup_retries: u32,

    /// Grant `member` when no step matches; otherwise the role stays absent
    pub default_to_member: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(300),
            max_cache_entries: 10_000,
            lookup_retries: 1,
            default_to_member: true,
        }
    }
}

impl ResolverConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.cache_ttl.is_zero() {
            return Err(AuthzError::Configuration(
                "role cache TTL must be greater than zero".to_string(),
            ));
        }
        if self.max_cache_entries == 0 {
            return Err(AuthzError::Configuration(
                "role cache must hold at least one entry".to_string(),
            ));
        }
        Ok(())
    }
}

/// Cached chain outcome
#[derive(Debug, Clone)]
struct CachedResolution {
    resolution: Option<Resolution>,
    cached_at: Instant,
    /// When the chain run that produced this entry started
    started_at: Instant,
}

impl CachedResolution {
    fn new(resolution: Option<Resolution>, started_at: Instant) -> Self {
        Self {
            resolution,
            cached_at: Instant::now(),
            started_at,
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.cached_at.elapsed() > ttl
    }
}

/// Role resolver
///
/// Thread-safe and cheap to clone; clones share the cache.
#[derive(Clone)]
pub struct RoleResolver {
    /// Backend tables
    directory: Arc<dyn RoleDirectory>,

    /// Fallback chain in evaluation order
    steps: Arc<Vec<Box<dyn ResolverStep>>>,

    /// Resolved roles by user id
    cache: Arc<DashMap<UserId, CachedResolution>>,

    config: ResolverConfig,

    /// Bumped by `invalidate_cache`; a chain run that straddles it is not cached
    generation: Arc<AtomicU64>,

    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl RoleResolver {
    /// Create a resolver with the standard chain and default settings
    pub fn new(directory: Arc<dyn RoleDirectory>) -> Self {
        Self::with_config(directory, ResolverConfig::default())
    }

    /// Create a resolver with the standard chain and custom settings
    pub fn with_config(directory: Arc<dyn RoleDirectory>, config: ResolverConfig) -> Self {
        Self::with_steps(directory, default_chain(), config)
    }

    /// Create a resolver with a custom chain
    pub fn with_steps(
        directory: Arc<dyn RoleDirectory>,
        steps: Vec<Box<dyn ResolverStep>>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            directory,
            steps: Arc::new(steps),
            cache: Arc::new(DashMap::new()),
            config,
            generation: Arc::new(AtomicU64::new(0)),
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Role of the session's user
    ///
    /// `Ok(None)` when there is no session or no user.
    pub async fn resolve_role(&self, session: Option<&Session>) -> Result<Option<Role>> {
        Ok(self.resolve(session).await?.map(|r| r.role))
    }

    /// Role of the session's user together with the step that produced it
    pub async fn resolve(&self, session: Option<&Session>) -> Result<Option<Resolution>> {
        let Some(user) = session.and_then(|s| s.user.as_ref()) else {
            debug!("No session user, role is absent");
            return Ok(None);
        };

        self.resolve_user(user).await
    }

    /// Role of a user, served from cache while fresh
    pub async fn resolve_user(&self, user: &User) -> Result<Option<Resolution>> {
        if let Some(cached) = self.cache.get(&user.id) {
            if !cached.is_expired(self.config.cache_ttl) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(cached.resolution.clone());
            }
            // Expired - remove and revalidate
            drop(cached);
            self.cache.remove(&user.id);
            debug!(user_id = %user.id, "Cached role expired, revalidating");
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let generation = self.generation.load(Ordering::SeqCst);
        let started = Instant::now();
        let resolution = self.run_chain(user).await?;

        if generation != self.generation.load(Ordering::SeqCst) {
            debug!(user_id = %user.id, "Role cache reset during resolution, not caching");
        } else {
            self.store(user, started, &resolution);
        }

        Ok(resolution)
    }

    fn store(&self, user: &User, started: Instant, resolution: &Option<Resolution>) {
        let mut full = self.cache.len() >= self.config.max_cache_entries;
        if full && !self.cache.contains_key(&user.id) {
            self.evict_expired();
            full = self.cache.len() >= self.config.max_cache_entries;
        }

        match self.cache.entry(user.id.clone()) {
            Entry::Occupied(mut entry) => {
                if entry.get().started_at <= started {
                    entry.insert(CachedResolution::new(resolution.clone(), started));
                } else {
                    debug!(user_id = %user.id, "Newer role already cached, keeping it");
                }
            }
            Entry::Vacant(entry) => {
                if full {
                    debug!(user_id = %user.id, "Role cache full, not caching");
                } else {
                    entry.insert(CachedResolution::new(resolution.clone(), started));
                }
            }
        }
    }

    /// Drop every entry past the freshness window
    fn evict_expired(&self) {
        let ttl = self.config.cache_ttl;
        let before = self.cache.len();
        self.cache.retain(|_, cached| !cached.is_expired(ttl));
        debug!(evicted = before.saturating_sub(self.cache.len()), "Evicted expired roles");
    }

    async fn run_chain(&self, user: &User) -> Result<Option<Resolution>> {
        for step in self.steps.iter() {
            if let Some(role) = self.run_step(step.as_ref(), user).await? {
                info!(user_id = %user.id, role = %role, source = %step.source(), "Resolved role");
                return Ok(Some(Resolution::new(user.id.clone(), role, step.source())));
            }
        }

        if self.config.default_to_member {
            info!(user_id = %user.id, "No role found, defaulting to member");
            Ok(Some(Resolution::new(
                user.id.clone(),
                Role::Member,
                RoleSource::Default,
            )))
        } else {
            warn!(user_id = %user.id, "No role found and default disabled, role is absent");
            Ok(None)
        }
    }

    async fn run_step(&self, step: &dyn ResolverStep, user: &User) -> Result<Option<Role>> {
        let mut attempt = 0;
        loop {
            match step.resolve(user, self.directory.as_ref()).await {
                Ok(role) => return Ok(role),
                Err(e) if attempt < self.config.lookup_retries => {
                    attempt += 1;
                    warn!(
                        user_id = %user.id,
                        source = %step.source(),
                        attempt,
                        error = %e,
                        "Role lookup failed, retrying"
                    );
                }
                Err(e) => {
                    warn!(user_id = %user.id, source = %step.source(), error = %e, "Role lookup failed");
                    return Err(e.into());
                }
            }
        }
    }

    /// Drop the cached role of one user
    pub fn invalidate(&self, user_id: &UserId) {
        self.cache.remove(user_id);
    }

    /// Drop every cached role
    pub fn invalidate_cache(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cache.clear();
    }

    /// Get cache statistics
    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            size: self.cache.len(),
            max_size: self.config.max_cache_entries,
            ttl_seconds: self.config.cache_ttl.as_secs(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Current cache size
    pub size: usize,
    /// Maximum cache size
    pub max_size: usize,
    /// Cache TTL in seconds
    pub ttl_seconds: u64,
    /// Lookups answered from cache
    pub hits: u64,
    /// Lookups that ran the chain
    pub misses: u64,
}
