//! Derived query cache and its coordinator
//!
//! Everything fetched on behalf of the signed-in user lives here, keyed by a
//! [`QueryKey`]. A reset bumps the cache generation so a fetch that started
//! under the previous identity cannot repopulate the cache when it lands.

use dashmap::DashMap;
use memberhub_authz::RoleResolver;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::debug;

/// Query identity, an ordered list of segments
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Whether `prefix` matches the leading segments of this key
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

#[derive(Debug, Clone)]
struct CachedQuery {
    value: Value,
    fetched_at: Instant,
    stale: bool,
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub stale: usize,
    pub generation: u64,
    pub resets: u64,
}

/// Owner of every identity-scoped cache
///
/// Holds the derived query cache and, when wired, the role resolver's cache.
/// `reset_all` clears both.
pub struct CacheCoordinator {
    entries: DashMap<QueryKey, CachedQuery>,
    generation: AtomicU64,
    resets: AtomicU64,
    resolver: Option<RoleResolver>,
}

impl CacheCoordinator {
    /// Create a coordinator owning only the query cache
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            generation: AtomicU64::new(0),
            resets: AtomicU64::new(0),
            resolver: None,
        }
    }

    /// Create a coordinator that also resets the role resolver's cache
    pub fn with_role_resolver(resolver: RoleResolver) -> Self {
        Self {
            resolver: Some(resolver),
            ..Self::new()
        }
    }

    /// Current cache generation
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Fresh cached value for `key`
    ///
    /// Stale (invalidated) entries are not returned.
    pub fn get(&self, key: &QueryKey) -> Option<Value> {
        self.entries
            .get(key)
            .filter(|entry| !entry.stale)
            .map(|entry| entry.value.clone())
    }

    /// When the fresh entry for `key` was fetched
    pub fn fetched_at(&self, key: &QueryKey) -> Option<Instant> {
        self.entries
            .get(key)
            .filter(|entry| !entry.stale)
            .map(|entry| entry.fetched_at)
    }

    /// Store a value under the current generation
    pub fn insert(&self, key: QueryKey, value: Value) {
        self.insert_at(self.generation(), key, value);
    }

    /// Store a value fetched under `generation`
    ///
    /// Returns `false` and drops the value when a reset happened since the
    /// fetch started.
    pub fn insert_at(&self, generation: u64, key: QueryKey, value: Value) -> bool {
        if generation != self.generation() {
            debug!(key = %key, generation, current = self.generation(), "Dropping result fetched before reset");
            return false;
        }

        self.entries.insert(
            key,
            CachedQuery {
                value,
                fetched_at: Instant::now(),
                stale: false,
            },
        );
        true
    }

    /// Return the cached value or fetch and cache it
    pub async fn fetch<F, Fut, E>(&self, key: QueryKey, fetcher: F) -> std::result::Result<Value, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<Value, E>>,
    {
        if let Some(value) = self.get(&key) {
            debug!(key = %key, "Query cache hit");
            return Ok(value);
        }

        let generation = self.generation();
        let value = fetcher().await?;
        self.insert_at(generation, key, value.clone());
        Ok(value)
    }

    /// Mark every entry under `prefix` stale; returns how many were marked
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut marked = 0;
        for mut entry in self.entries.iter_mut() {
            if entry.key().starts_with(prefix) && !entry.stale {
                entry.stale = true;
                marked += 1;
            }
        }
        marked
    }

    /// Mark every entry stale regardless of key
    pub fn invalidate_all(&self) -> usize {
        self.invalidate(&QueryKey::new(Vec::<String>::new()))
    }

    /// Invalidate and drop every identity-scoped cached result
    ///
    /// Completes before returning; calling it with nothing cached leaves the
    /// cache empty.
    pub fn reset_all(&self) {
        let invalidated = self.invalidate_all();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let dropped = self.entries.len();
        self.entries.clear();

        if let Some(resolver) = &self.resolver {
            resolver.invalidate_cache();
        }

        self.resets.fetch_add(1, Ordering::SeqCst);
        debug!(invalidated, dropped, generation, "Reset all caches");
    }

    /// Number of `reset_all` calls so far
    pub fn reset_count(&self) -> u64 {
        self.resets.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            stale: self.entries.iter().filter(|e| e.stale).count(),
            generation: self.generation(),
            resets: self.reset_count(),
        }
    }
}

impl Default for CacheCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memberhub_core::memory::InMemoryDirectory;
    use memberhub_core::{Session, User};
    use serde_json::json;
    use std::sync::Arc;

    fn key(segments: &[&str]) -> QueryKey {
        QueryKey::new(segments.iter().copied())
    }

    #[test]
    fn test_invalidate_by_prefix() {
        let cache = CacheCoordinator::new();
        cache.insert(key(&["members", "search:a"]), json!([1]));
        cache.insert(key(&["members", "search:b"]), json!([2]));
        cache.insert(key(&["payments"]), json!([3]));

        assert_eq!(cache.invalidate(&key(&["members"])), 2);
        assert!(cache.get(&key(&["members", "search:a"])).is_none());
        assert_eq!(cache.get(&key(&["payments"])), Some(json!([3])));
    }

    #[test]
    fn test_reset_all_empties_and_bumps_generation() {
        let cache = CacheCoordinator::new();
        cache.insert(key(&["members"]), json!({"count": 3}));

        cache.reset_all();
        assert!(cache.is_empty());
        assert_eq!(cache.generation(), 1);

        cache.reset_all();
        assert!(cache.is_empty());
        assert_eq!(cache.reset_count(), 2);
    }

    #[test]
    fn test_insert_from_previous_generation_is_dropped() {
        let cache = CacheCoordinator::new();
        let started = cache.generation();
        cache.reset_all();

        assert!(!cache.insert_at(started, key(&["members"]), json!([])));
        assert!(cache.get(&key(&["members"])).is_none());
    }

    #[tokio::test]
    async fn test_fetch_caches_result() {
        let cache = CacheCoordinator::new();
        let calls = std::sync::atomic::AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .fetch(key(&["audit_logs"]), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(json!(["entry"]))
                })
                .await
                .unwrap();
            assert_eq!(value, json!(["entry"]));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_error_is_not_cached() {
        let cache = CacheCoordinator::new();
        let result = cache
            .fetch(key(&["members"]), || async { Err::<Value, _>("offline") })
            .await;

        assert_eq!(result, Err("offline"));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_reset_clears_role_cache() {
        let directory = Arc::new(InMemoryDirectory::new().with_role("u1", "admin"));
        let resolver = RoleResolver::new(directory.clone());
        let cache = CacheCoordinator::with_role_resolver(resolver.clone());
        let session = Session::new("token", User::new("u1"));

        resolver.resolve_role(Some(&session)).await.unwrap();
        assert_eq!(resolver.cache_stats().size, 1);

        cache.reset_all();
        assert_eq!(resolver.cache_stats().size, 0);
    }
}
