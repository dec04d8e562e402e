//! SemTab Cache - Lookup Memoization
//!
//! Bounded, age-aware memoization of knowledge-base lookups. Keys are
//! derived deterministically from a normalized query signature, and each
//! knowledge base gets its own LRU partition.
//!
//! The eviction policy sits behind [`CacheBackend`], so an alternative
//! backend can be swapped in through [`ResultCache::with_backends`].

pub mod key;
pub mod lru;
pub mod result_cache;
pub mod traits;

pub use key::{normalize_query, CacheKey, LookupKind};
pub use lru::LruCacheBackend;
pub use result_cache::{CachedLookup, ResultCache};
pub use traits::{CacheBackend, CacheStats};
