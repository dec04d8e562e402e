//! Entity Resolution - cell values to candidate entities
//!
//! Every cell is searched in both knowledge bases at once. Hits are merged,
//! re-ranked and typed; entities with weak or missing type evidence are
//! enriched from the other knowledge base. Failures at any step shrink the
//! evidence and are logged, they never abort a column.

use futures_util::future::join_all;
use semtab_core::{
    clamp_unit, label_from_uri, Cell, Entity, EntityCandidate, EntitySearchConfig, KnowledgeBase,
    SemanticType,
};
use semtab_kb::{KbResult, KnowledgeBases};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Resolves cells against both knowledge bases.
///
/// Keeps a memo of resolved raw values for the current run; the shared
/// result cache underneath survives across runs.
pub struct EntityResolver {
    kbs: KnowledgeBases,
    config: EntitySearchConfig,
    memo: Mutex<HashMap<String, Vec<EntityCandidate>>>,
}

impl EntityResolver {
    pub fn new(kbs: KnowledgeBases, config: EntitySearchConfig) -> Self {
        Self {
            kbs,
            config,
            memo: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &EntitySearchConfig {
        &self.config
    }

    /// Whether a value is never looked up: blank, a stop value or too short.
    pub fn should_skip(&self, value: &str) -> bool {
        let value = value.trim();
        value.is_empty()
            || self.config.stop_values.iter().any(|stop| stop == value)
            || value.chars().count() < self.config.min_value_length
    }

    /// Forget every memoised value.
    pub fn clear_memo(&self) {
        if let Ok(mut memo) = self.memo.lock() {
            memo.clear();
        }
    }

    /// Number of memoised values.
    pub fn memo_len(&self) -> usize {
        self.memo.lock().map(|memo| memo.len()).unwrap_or(0)
    }

    fn memoised(&self, value: &str) -> Option<Vec<EntityCandidate>> {
        self.memo.lock().ok()?.get(value).cloned()
    }

    fn remember(&self, value: &str, candidates: &[EntityCandidate]) {
        if let Ok(mut memo) = self.memo.lock() {
            memo.insert(value.to_string(), candidates.to_vec());
        }
    }

    /// Candidate entities for one cell, best first.
    pub async fn resolve_cell(&self, cell: &Cell) -> Vec<EntityCandidate> {
        if self.should_skip(&cell.value) {
            debug!(row = cell.row_index, column = cell.column_index, "cell skipped");
            return Vec::new();
        }

        if let Some(cached) = self.memoised(&cell.value) {
            debug!(value = %cell.value, "memo hit");
            return cached.iter().map(|c| c.rebind(cell)).collect();
        }

        let query = cell.value.trim();
        let Some(entities) = self.search_both(query).await else {
            return Vec::new();
        };
        let entities = self.rank(query, entities);

        let typed = join_all(entities.iter().map(|entity| self.collect_types(entity))).await;
        let candidates: Vec<EntityCandidate> = entities
            .into_iter()
            .zip(typed)
            .filter(|(_, types)| !types.is_empty())
            .map(|(entity, types)| EntityCandidate::new(cell.clone(), entity, types))
            .collect();

        debug!(
            value = %cell.value,
            candidates = candidates.len(),
            "cell resolved"
        );
        self.remember(&cell.value, &candidates);
        candidates
    }

    /// Resolve a column in batches, with the configured pause between batches.
    pub async fn resolve_column(&self, cells: &[Cell]) -> Vec<EntityCandidate> {
        let throttle = &self.config.throttle;
        let batch_size = throttle.batch_size.max(1);
        let batches = cells.chunks(batch_size).count();
        let mut candidates = Vec::new();

        for (i, batch) in cells.chunks(batch_size).enumerate() {
            let resolved = join_all(batch.iter().map(|cell| self.resolve_cell(cell))).await;
            candidates.extend(resolved.into_iter().flatten());

            if i + 1 < batches && !throttle.batch_delay.is_zero() {
                tokio::time::sleep(throttle.batch_delay).await;
            }
        }

        info!(
            cells = cells.len(),
            candidates = candidates.len(),
            "column resolved"
        );
        candidates
    }

    // ========================================================================
    // SEARCH AND RANKING
    // ========================================================================

    /// Search both knowledge bases concurrently. `None` when both failed.
    async fn search_both(&self, query: &str) -> Option<Vec<Entity>> {
        let language = Some(self.config.language.as_str());
        let limit = self.config.search_limit;
        let (wikidata, dbpedia) = tokio::join!(
            self.kbs.wikidata().search_entities(query, language, limit),
            self.kbs.dbpedia().search_entities(query, language, limit),
        );

        let mut entities = Vec::new();
        let mut failures = 0;
        for (kb, result) in [
            (KnowledgeBase::Wikidata, wikidata),
            (KnowledgeBase::DbPedia, dbpedia),
        ] {
            match result {
                Ok(found) => entities.extend(found),
                Err(e) => {
                    failures += 1;
                    warn!(kb = %kb, query, error = %e, "entity search failed");
                }
            }
        }

        if failures == KnowledgeBase::ALL.len() {
            warn!(query, "cell resolution failed in both knowledge bases");
            return None;
        }
        Some(entities)
    }

    /// Deduplicate by URI, apply the exact-label bonus, filter and cut.
    pub(crate) fn rank(&self, query: &str, entities: Vec<Entity>) -> Vec<Entity> {
        let mut merged: Vec<Entity> = Vec::with_capacity(entities.len());
        let mut positions: HashMap<String, usize> = HashMap::new();
        for entity in entities {
            match positions.get(&entity.uri) {
                Some(&i) => {
                    if entity.confidence > merged[i].confidence {
                        merged[i] = entity;
                    }
                }
                None => {
                    positions.insert(entity.uri.clone(), merged.len());
                    merged.push(entity);
                }
            }
        }

        let query = query.to_lowercase();
        for entity in &mut merged {
            if entity.label.trim().to_lowercase() == query {
                entity.confidence = clamp_unit(entity.confidence + self.config.exact_match_bonus);
            }
        }

        merged.retain(|e| e.confidence >= self.config.min_confidence);
        merged.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        merged.truncate(self.config.max_entities_per_cell);
        merged
    }

    // ========================================================================
    // TYPES
    // ========================================================================

    /// Types from the entity's own knowledge base, enriched from the other
    /// one when they are missing or the match is weak.
    async fn collect_types(&self, entity: &Entity) -> Vec<SemanticType> {
        let mut types = match self.kbs.get(entity.source).entity_types(&entity.uri).await {
            Ok(types) => types,
            Err(e) => {
                warn!(kb = %entity.source, uri = %entity.uri, error = %e, "type lookup failed");
                Vec::new()
            }
        };

        if types.is_empty() || entity.confidence < self.config.cross_source_threshold {
            match self.cross_source_types(entity).await {
                Ok(extra) => {
                    for t in extra {
                        if !types.iter().any(|known| known.uri == t.uri) {
                            types.push(t);
                        }
                    }
                }
                Err(e) => {
                    warn!(
                        kb = %entity.source.other(),
                        uri = %entity.uri,
                        error = %e,
                        "cross-source lookup failed"
                    );
                }
            }
        }
        types
    }

    /// Types of the best match for `entity` in the other knowledge base.
    async fn cross_source_types(&self, entity: &Entity) -> KbResult<Vec<SemanticType>> {
        let other = entity.source.other();
        let query = match entity.source {
            KnowledgeBase::DbPedia => label_from_uri(&entity.uri),
            KnowledgeBase::Wikidata => entity.label.trim().to_string(),
        };
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let client = self.kbs.get(other);
        let found = client
            .search_entities(
                &query,
                Some(self.config.language.as_str()),
                self.config.search_limit,
            )
            .await?;
        let Some(best) = found.into_iter().next() else {
            return Ok(Vec::new());
        };

        debug!(
            uri = %entity.uri,
            counterpart = %best.uri,
            "cross-source match"
        );
        client.entity_types(&best.uri).await
    }
}

impl std::fmt::Debug for EntityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityResolver")
            .field("kbs", &self.kbs)
            .field("memo_len", &self.memo_len())
            .finish()
    }
}
