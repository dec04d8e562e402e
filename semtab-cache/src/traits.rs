//! Cache backend trait and usage statistics.

use crate::key::CacheKey;

/// Cache backend trait for pluggable eviction policies.
///
/// Implementations must be safe to read while other tasks write. A stored
/// empty value is a hit, distinct from a key that was never written.
pub trait CacheBackend<V>: Send + Sync {
    /// Look up a value. Expired entries count as misses.
    fn get(&self, key: &CacheKey) -> Option<V>;

    /// Insert or replace a value, evicting as needed to respect the bounds.
    fn put(&self, key: CacheKey, value: V);

    /// Remove one entry. Returns whether it was present.
    fn invalidate(&self, key: &CacheKey) -> bool;

    /// Remove every entry. Statistics are kept.
    fn clear(&self);

    /// Number of entries currently stored.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn stats(&self) -> CacheStats;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses, including expired reads.
    pub misses: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
    /// Number of evictions due to capacity.
    pub evictions: u64,
    /// Number of entries dropped for exceeding the maximum age.
    pub expirations: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
