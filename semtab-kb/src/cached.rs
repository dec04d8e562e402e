//! Caching and retrying decorator around a knowledge-base client.

use crate::retry::with_retry;
use crate::{KbResult, KnowledgeBaseClient};
use async_trait::async_trait;
use semtab_cache::{CacheKey, CachedLookup, ResultCache};
use semtab_core::{Entity, KnowledgeBase, RetryConfig, SemanticType};
use std::sync::Arc;

/// Read-through wrapper: answers from the shared cache when it can,
/// otherwise calls the inner client under the retry policy and stores the
/// completed answer. Failures are never cached.
///
/// Concurrent misses for the same key each reach the inner client; every
/// completed call overwrites the entry.
pub struct CachedKnowledgeBase {
    inner: Arc<dyn KnowledgeBaseClient>,
    cache: ResultCache,
    retry: RetryConfig,
}

impl CachedKnowledgeBase {
    pub fn new(
        inner: Arc<dyn KnowledgeBaseClient>,
        cache: ResultCache,
        retry: RetryConfig,
    ) -> Self {
        Self {
            inner,
            cache,
            retry,
        }
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }
}

#[async_trait]
impl KnowledgeBaseClient for CachedKnowledgeBase {
    fn source(&self) -> KnowledgeBase {
        self.inner.source()
    }

    async fn search_entities(
        &self,
        query: &str,
        language: Option<&str>,
        limit: usize,
    ) -> KbResult<Vec<Entity>> {
        let kb = self.source();
        let key = CacheKey::search(kb, query, language, limit);
        if let Some(hit) = self.cache.entities(&key) {
            tracing::debug!(kb = %kb, query, "search served from cache");
            return Ok(hit);
        }

        let entities = with_retry(&self.retry, kb, "search_entities", || {
            self.inner.search_entities(query, language, limit)
        })
        .await?;
        self.cache.put(key, CachedLookup::Entities(entities.clone()));
        Ok(entities)
    }

    async fn entity_types(&self, entity_uri: &str) -> KbResult<Vec<SemanticType>> {
        let kb = self.source();
        let key = CacheKey::types(kb, entity_uri);
        if let Some(hit) = self.cache.types(&key) {
            return Ok(hit);
        }

        let types = with_retry(&self.retry, kb, "entity_types", || {
            self.inner.entity_types(entity_uri)
        })
        .await?;
        self.cache.put(key, CachedLookup::Types(types.clone()));
        Ok(types)
    }

    async fn parent_types(&self, type_uri: &str) -> KbResult<Vec<String>> {
        let kb = self.source();
        let key = CacheKey::parents(kb, type_uri);
        if let Some(hit) = self.cache.parents(&key) {
            return Ok(hit);
        }

        let parents = with_retry(&self.retry, kb, "parent_types", || {
            self.inner.parent_types(type_uri)
        })
        .await?;
        self.cache.put(key, CachedLookup::Parents(parents.clone()));
        Ok(parents)
    }
}

impl std::fmt::Debug for CachedKnowledgeBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedKnowledgeBase")
            .field("source", &self.inner.source())
            .field("cache", &self.cache)
            .field("max_retries", &self.retry.max_retries)
            .finish()
    }
}
