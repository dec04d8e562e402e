//! SemTab KB - Knowledge Base Access Layer
//!
//! Source-agnostic client trait for the two knowledge bases, plus the
//! decorators every call goes through before it reaches the network:
//! result caching, retry with exponential backoff and a per-attempt timeout.
//! Concrete Wikidata and DBpedia clients live in [`providers`].

use async_trait::async_trait;
use semtab_core::{
    Entity, KnowledgeBase, KnowledgeBaseError, RetryConfig, SemanticType, SemtabResult,
    ValidationError,
};
use std::sync::Arc;

pub mod cached;
pub mod providers;
pub mod retry;

pub use cached::CachedKnowledgeBase;
pub use providers::{DbpediaClient, HttpCore, WikidataClient};
pub use retry::with_retry;

use semtab_cache::ResultCache;

/// Result type for a single knowledge-base call.
pub type KbResult<T> = Result<T, KnowledgeBaseError>;

// ============================================================================
// CLIENT TRAIT
// ============================================================================

/// Trait for knowledge-base clients.
/// Implementations must be thread-safe (Send + Sync) and idempotent, since
/// every call may be retried.
///
/// "No results" is an empty vector, never an error.
#[async_trait]
pub trait KnowledgeBaseClient: Send + Sync {
    /// Which knowledge base this client talks to.
    fn source(&self) -> KnowledgeBase;

    /// Free-text entity search.
    ///
    /// # Arguments
    /// * `query` - Cell value to look up
    /// * `language` - Label language, or the client's default
    /// * `limit` - Maximum number of results
    async fn search_entities(
        &self,
        query: &str,
        language: Option<&str>,
        limit: usize,
    ) -> KbResult<Vec<Entity>>;

    /// Direct types of an entity.
    async fn entity_types(&self, entity_uri: &str) -> KbResult<Vec<SemanticType>>;

    /// Immediate parent type URIs of a type.
    async fn parent_types(&self, type_uri: &str) -> KbResult<Vec<String>>;
}

// ============================================================================
// CLIENT PAIR
// ============================================================================

/// One client per knowledge base, constructed once and passed down.
#[derive(Clone)]
pub struct KnowledgeBases {
    wikidata: Arc<dyn KnowledgeBaseClient>,
    dbpedia: Arc<dyn KnowledgeBaseClient>,
}

impl KnowledgeBases {
    /// Pair two clients. Each must report the knowledge base of its slot.
    pub fn new(
        wikidata: Arc<dyn KnowledgeBaseClient>,
        dbpedia: Arc<dyn KnowledgeBaseClient>,
    ) -> SemtabResult<Self> {
        for (slot, client) in [
            (KnowledgeBase::Wikidata, &wikidata),
            (KnowledgeBase::DbPedia, &dbpedia),
        ] {
            if client.source() != slot {
                return Err(ValidationError::InvalidValue {
                    field: format!("{} client", slot),
                    reason: format!("client reports source {}", client.source()),
                }
                .into());
            }
        }
        Ok(Self { wikidata, dbpedia })
    }

    /// Wrap both clients with the shared result cache and retry policy.
    pub fn cached(self, cache: ResultCache, retry: RetryConfig) -> Self {
        Self {
            wikidata: Arc::new(CachedKnowledgeBase::new(
                self.wikidata,
                cache.clone(),
                retry.clone(),
            )),
            dbpedia: Arc::new(CachedKnowledgeBase::new(self.dbpedia, cache, retry)),
        }
    }

    pub fn get(&self, kb: KnowledgeBase) -> &Arc<dyn KnowledgeBaseClient> {
        match kb {
            KnowledgeBase::Wikidata => &self.wikidata,
            KnowledgeBase::DbPedia => &self.dbpedia,
        }
    }

    pub fn wikidata(&self) -> &Arc<dyn KnowledgeBaseClient> {
        &self.wikidata
    }

    pub fn dbpedia(&self) -> &Arc<dyn KnowledgeBaseClient> {
        &self.dbpedia
    }
}

impl std::fmt::Debug for KnowledgeBases {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeBases")
            .field("wikidata", &self.wikidata.source())
            .field("dbpedia", &self.dbpedia.source())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Empty(KnowledgeBase);

    #[async_trait]
    impl KnowledgeBaseClient for Empty {
        fn source(&self) -> KnowledgeBase {
            self.0
        }

        async fn search_entities(
            &self,
            _query: &str,
            _language: Option<&str>,
            _limit: usize,
        ) -> KbResult<Vec<Entity>> {
            Ok(Vec::new())
        }

        async fn entity_types(&self, _entity_uri: &str) -> KbResult<Vec<SemanticType>> {
            Ok(Vec::new())
        }

        async fn parent_types(&self, _type_uri: &str) -> KbResult<Vec<String>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_pair_routes_by_source() {
        let kbs = KnowledgeBases::new(
            Arc::new(Empty(KnowledgeBase::Wikidata)),
            Arc::new(Empty(KnowledgeBase::DbPedia)),
        )
        .unwrap();
        for kb in KnowledgeBase::ALL {
            assert_eq!(kbs.get(kb).source(), kb);
        }
    }

    #[test]
    fn test_pair_rejects_swapped_clients() {
        let result = KnowledgeBases::new(
            Arc::new(Empty(KnowledgeBase::DbPedia)),
            Arc::new(Empty(KnowledgeBase::Wikidata)),
        );
        assert!(matches!(
            result,
            Err(semtab_core::SemtabError::Validation(
                ValidationError::InvalidValue { .. }
            ))
        ));
    }

    #[test]
    fn test_cached_pair_keeps_sources() {
        let kbs = KnowledgeBases::new(
            Arc::new(Empty(KnowledgeBase::Wikidata)),
            Arc::new(Empty(KnowledgeBase::DbPedia)),
        )
        .unwrap()
        .cached(ResultCache::default(), RetryConfig::default());
        assert_eq!(kbs.wikidata().source(), KnowledgeBase::Wikidata);
        assert_eq!(kbs.dbpedia().source(), KnowledgeBase::DbPedia);
    }
}
