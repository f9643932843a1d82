//! Keyed configuration cache using moka
//!
//! Wraps a provider so repeated reads of the same key are served from memory.
//! The cache is owned by the instance that created it; invalidation is
//! explicit and bumps the version stamp so dependents can notice staleness.

use crate::provider::ConfigProvider;
use moka::sync::Cache;
use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Number of entries in cache
    pub entry_count: u64,
    /// Current version stamp
    pub version: u64,
}

/// Caching wrapper around another provider
///
/// Misses are cached too, so an unset key is not re-read until invalidated.
#[derive(Debug)]
pub struct CachedProvider<P> {
    source: P,
    inner: Cache<String, Option<String>>,
    version: AtomicU64,
}

impl<P: ConfigProvider> CachedProvider<P> {
    /// Create new cache with max capacity
    #[inline]
    #[must_use]
    pub fn new(source: P, max_capacity: u64) -> Self {
        Self {
            source,
            inner: Cache::new(max_capacity),
            version: AtomicU64::new(0),
        }
    }

    /// Drop a single key
    pub fn invalidate(&self, key: &str) {
        self.inner.invalidate(key);
        self.version.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(key, "configuration cache entry invalidated");
    }

    /// Drop every key
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
        self.version.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("configuration cache cleared");
    }

    /// Check if key is cached
    #[inline]
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    /// Get cache statistics
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.inner.run_pending_tasks();
        CacheStats {
            entry_count: self.inner.entry_count(),
            version: self.version.load(Ordering::SeqCst),
        }
    }

    /// Underlying provider
    #[inline]
    #[must_use]
    pub fn source(&self) -> &P {
        &self.source
    }
}

impl<P: ConfigProvider> ConfigProvider for CachedProvider<P> {
    fn get(&self, key: &str) -> Option<String> {
        self.inner
            .get_with(key.to_string(), || self.source.get(key))
    }

    fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst).wrapping_add(self.source.version())
    }
}
