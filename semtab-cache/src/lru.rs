//! In-memory LRU backend with optional maximum age.

use crate::key::CacheKey;
use crate::traits::{CacheBackend, CacheStats};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    inserted_at: Instant,
    /// Position in the recency index.
    touched: u64,
    /// Position in the insertion index.
    inserted: u64,
}

struct LruState<V> {
    entries: HashMap<CacheKey, Entry<V>>,
    /// Recency order, least recently used first.
    by_recency: BTreeMap<u64, CacheKey>,
    /// Insertion order, oldest first.
    by_insertion: BTreeMap<u64, CacheKey>,
    clock: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

impl<V> LruState<V> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            by_recency: BTreeMap::new(),
            by_insertion: BTreeMap::new(),
            clock: 0,
            hits: 0,
            misses: 0,
            evictions: 0,
            expirations: 0,
        }
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn remove(&mut self, key: &CacheKey) -> Option<Entry<V>> {
        let entry = self.entries.remove(key)?;
        self.by_recency.remove(&entry.touched);
        self.by_insertion.remove(&entry.inserted);
        Some(entry)
    }

    /// Drop entries older than `max_age`, oldest first.
    fn purge_expired(&mut self, max_age: Duration, now: Instant) {
        while let Some((_, key)) = self.by_insertion.first_key_value() {
            let expired = self
                .entries
                .get(key)
                .map(|e| now.duration_since(e.inserted_at) > max_age)
                .unwrap_or(true);
            if !expired {
                break;
            }
            let key = key.clone();
            self.remove(&key);
            self.expirations += 1;
        }
    }

    fn evict_lru(&mut self) -> Option<CacheKey> {
        let (_, key) = self.by_recency.pop_first()?;
        if let Some(entry) = self.entries.remove(&key) {
            self.by_insertion.remove(&entry.inserted);
        }
        self.evictions += 1;
        Some(key)
    }
}

/// Bounded least-recently-used cache.
///
/// Holds at most `max_entries` values. When `max_age` is set, entries older
/// than it are treated as absent and dropped on the next access or insert.
/// Reads refresh recency; writes reset both recency and age.
pub struct LruCacheBackend<V> {
    state: Mutex<LruState<V>>,
    max_entries: usize,
    max_age: Option<Duration>,
}

impl<V> LruCacheBackend<V> {
    /// Create a cache. A `max_entries` of zero is raised to one.
    pub fn new(max_entries: usize, max_age: Option<Duration>) -> Self {
        Self {
            state: Mutex::new(LruState::new()),
            max_entries: max_entries.max(1),
            max_age,
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn max_age(&self) -> Option<Duration> {
        self.max_age
    }
}

impl<V: Clone + Send> CacheBackend<V> for LruCacheBackend<V> {
    fn get(&self, key: &CacheKey) -> Option<V> {
        let mut state = self.state.lock().ok()?;
        let now = Instant::now();

        let Some(inserted_at) = state.entries.get(key).map(|e| e.inserted_at) else {
            state.misses += 1;
            return None;
        };
        if self
            .max_age
            .is_some_and(|max_age| now.duration_since(inserted_at) > max_age)
        {
            state.remove(key);
            state.expirations += 1;
            state.misses += 1;
            return None;
        }

        let tick = state.tick();
        let (previous, value) = match state.entries.get_mut(key) {
            Some(entry) => {
                let previous = entry.touched;
                entry.touched = tick;
                (previous, entry.value.clone())
            }
            None => return None,
        };
        state.by_recency.remove(&previous);
        state.by_recency.insert(tick, key.clone());
        state.hits += 1;
        Some(value)
    }

    fn put(&self, key: CacheKey, value: V) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        let now = Instant::now();

        if let Some(max_age) = self.max_age {
            state.purge_expired(max_age, now);
        }
        state.remove(&key);
        while state.entries.len() >= self.max_entries {
            match state.evict_lru() {
                Some(evicted) => {
                    tracing::trace!(key = %evicted, "evicted least recently used entry")
                }
                None => break,
            }
        }

        let touched = state.tick();
        let inserted = state.tick();
        state.by_recency.insert(touched, key.clone());
        state.by_insertion.insert(inserted, key.clone());
        state.entries.insert(
            key,
            Entry {
                value,
                inserted_at: now,
                touched,
                inserted,
            },
        );
    }

    fn invalidate(&self, key: &CacheKey) -> bool {
        self.state
            .lock()
            .map(|mut state| state.remove(key).is_some())
            .unwrap_or(false)
    }

    fn clear(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.entries.clear();
            state.by_recency.clear();
            state.by_insertion.clear();
        }
    }

    fn len(&self) -> usize {
        self.state.lock().map(|s| s.entries.len()).unwrap_or(0)
    }

    fn stats(&self) -> CacheStats {
        self.state
            .lock()
            .map(|s| CacheStats {
                hits: s.hits,
                misses: s.misses,
                entry_count: s.entries.len() as u64,
                evictions: s.evictions,
                expirations: s.expirations,
            })
            .unwrap_or_default()
    }
}

impl<V> std::fmt::Debug for LruCacheBackend<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LruCacheBackend")
            .field("max_entries", &self.max_entries)
            .field("max_age", &self.max_age)
            .field(
                "current_size",
                &self.state.lock().map(|s| s.entries.len()).unwrap_or(0),
            )
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use semtab_core::KnowledgeBase;

    fn key(n: usize) -> CacheKey {
        CacheKey::search(KnowledgeBase::Wikidata, &format!("value {}", n), Some("en"), 10)
    }

    #[test]
    fn test_get_before_put_is_miss() {
        let cache: LruCacheBackend<Vec<u32>> = LruCacheBackend::new(4, None);
        assert_eq!(cache.get(&key(1)), None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_empty_value_is_a_hit() {
        let cache: LruCacheBackend<Vec<u32>> = LruCacheBackend::new(4, None);
        cache.put(key(1), vec![]);
        assert_eq!(cache.get(&key(1)), Some(vec![]));
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let cache = LruCacheBackend::new(3, None);
        cache.put(key(1), 1);
        cache.put(key(2), 2);
        cache.put(key(3), 3);

        // Touch 1 so 2 becomes the oldest.
        assert_eq!(cache.get(&key(1)), Some(1));
        cache.put(key(4), 4);

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get(&key(2)), None);
        assert_eq!(cache.get(&key(1)), Some(1));
        assert_eq!(cache.get(&key(3)), Some(3));
        assert_eq!(cache.get(&key(4)), Some(4));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let cache = LruCacheBackend::new(2, None);
        cache.put(key(1), 1);
        cache.put(key(2), 2);
        cache.put(key(1), 10);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&key(1)), Some(10));
        assert_eq!(cache.get(&key(2)), Some(2));
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_expired_entries_are_absent() {
        let cache = LruCacheBackend::new(8, Some(Duration::from_millis(20)));
        cache.put(key(1), 1);
        std::thread::sleep(Duration::from_millis(40));

        assert_eq!(cache.get(&key(1)), None);
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats().expirations, 1);
    }

    #[test]
    fn test_insert_purges_expired() {
        let cache = LruCacheBackend::new(8, Some(Duration::from_millis(20)));
        cache.put(key(1), 1);
        cache.put(key(2), 2);
        std::thread::sleep(Duration::from_millis(40));
        cache.put(key(3), 3);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().expirations, 2);
    }

    #[test]
    fn test_invalidate_and_clear() {
        let cache = LruCacheBackend::new(8, None);
        cache.put(key(1), 1);
        cache.put(key(2), 2);

        assert!(cache.invalidate(&key(1)));
        assert!(!cache.invalidate(&key(1)));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get(&key(2)), None);
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let cache = LruCacheBackend::new(0, None);
        cache.put(key(1), 1);
        assert_eq!(cache.max_entries(), 1);
        assert_eq!(cache.get(&key(1)), Some(1));
    }
}
