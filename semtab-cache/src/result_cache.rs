//! Result cache shared by both knowledge-base clients.

use crate::key::CacheKey;
use crate::lru::LruCacheBackend;
use crate::traits::{CacheBackend, CacheStats};
use semtab_core::{CacheSettings, Entity, KnowledgeBase, SemanticType};
use std::sync::Arc;

/// A memoized knowledge-base answer.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedLookup {
    Entities(Vec<Entity>),
    Types(Vec<SemanticType>),
    Parents(Vec<String>),
}

/// Memoization of knowledge-base lookups, partitioned per knowledge base.
///
/// Each partition has its own backend and bounds. Keys carry their knowledge
/// base, so callers never pick a partition by hand.
#[derive(Clone)]
pub struct ResultCache {
    wikidata: Arc<dyn CacheBackend<CachedLookup>>,
    dbpedia: Arc<dyn CacheBackend<CachedLookup>>,
}

impl ResultCache {
    /// LRU partitions sized from the settings.
    pub fn new(settings: &CacheSettings) -> Self {
        Self {
            wikidata: Arc::new(LruCacheBackend::new(
                settings.wikidata.max_entries,
                settings.wikidata.max_age,
            )),
            dbpedia: Arc::new(LruCacheBackend::new(
                settings.dbpedia.max_entries,
                settings.dbpedia.max_age,
            )),
        }
    }

    /// Use caller-provided backends, for alternative eviction policies.
    pub fn with_backends(
        wikidata: Arc<dyn CacheBackend<CachedLookup>>,
        dbpedia: Arc<dyn CacheBackend<CachedLookup>>,
    ) -> Self {
        Self { wikidata, dbpedia }
    }

    fn partition(&self, kb: KnowledgeBase) -> &dyn CacheBackend<CachedLookup> {
        match kb {
            KnowledgeBase::Wikidata => self.wikidata.as_ref(),
            KnowledgeBase::DbPedia => self.dbpedia.as_ref(),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<CachedLookup> {
        self.partition(key.knowledge_base()).get(key)
    }

    pub fn put(&self, key: CacheKey, value: CachedLookup) {
        self.partition(key.knowledge_base()).put(key, value)
    }

    pub fn invalidate(&self, key: &CacheKey) -> bool {
        self.partition(key.knowledge_base()).invalidate(key)
    }

    /// Empty both partitions.
    pub fn clear(&self) {
        self.wikidata.clear();
        self.dbpedia.clear();
    }

    /// Entries stored for one knowledge base.
    pub fn len(&self, kb: KnowledgeBase) -> usize {
        self.partition(kb).len()
    }

    /// Entries stored across both knowledge bases.
    pub fn total_len(&self) -> usize {
        self.wikidata.len() + self.dbpedia.len()
    }

    pub fn stats(&self, kb: KnowledgeBase) -> CacheStats {
        self.partition(kb).stats()
    }

    /// Cached search result. A stored value of another shape is a miss.
    pub fn entities(&self, key: &CacheKey) -> Option<Vec<Entity>> {
        match self.get(key)? {
            CachedLookup::Entities(entities) => Some(entities),
            _ => None,
        }
    }

    pub fn types(&self, key: &CacheKey) -> Option<Vec<SemanticType>> {
        match self.get(key)? {
            CachedLookup::Types(types) => Some(types),
            _ => None,
        }
    }

    pub fn parents(&self, key: &CacheKey) -> Option<Vec<String>> {
        match self.get(key)? {
            CachedLookup::Parents(parents) => Some(parents),
            _ => None,
        }
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(&CacheSettings::default())
    }
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("wikidata_entries", &self.wikidata.len())
            .field("dbpedia_entries", &self.dbpedia.len())
            .finish()
    }
}
