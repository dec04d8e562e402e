//! Annotator - end-to-end table annotation
//!
//! Wires the stages together in order: resolution, mapping enhancement,
//! column relations, URI patterns, type extraction and aggregation. Cell
//! entity annotations are chosen last, guided by the column types.

use crate::aggregation::TypeAggregator;
use crate::column_relations::ColumnRelationshipAnalyzer;
use crate::enhancer::MappingEnhancer;
use crate::extraction::TypeExtractor;
use crate::mapping::TypeMappingTable;
use crate::relationships::TypeRelationshipTable;
use crate::resolution::EntityResolver;
use crate::uri_patterns::UriPatternAnalyzer;
use semtab_cache::{CacheStats, ResultCache};
use semtab_core::{
    AnnotatorConfig, CellEntityAnnotation, ColumnRelation, ColumnTypeAnnotation, EntityCandidate,
    KnowledgeBase, SemtabResult, Table, ValidationError,
};
use semtab_kb::{DbpediaClient, KnowledgeBases, WikidataClient};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

// ============================================================================
// RESULTS
// ============================================================================

/// Everything one annotation run produces.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnnotationReport {
    /// Column type annotations, in column order.
    pub columns: Vec<ColumnTypeAnnotation>,
    /// Cell entity annotations, in column then row order.
    pub cells: Vec<CellEntityAnnotation>,
    /// Inferred column relations, strongest first.
    pub relations: Vec<ColumnRelation>,
}

/// Cache statistics for both knowledge bases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheReport {
    pub wikidata: CacheStats,
    pub dbpedia: CacheStats,
}

impl CacheReport {
    pub fn get(&self, kb: KnowledgeBase) -> &CacheStats {
        match kb {
            KnowledgeBase::Wikidata => &self.wikidata,
            KnowledgeBase::DbPedia => &self.dbpedia,
        }
    }
}

// ============================================================================
// ANNOTATOR
// ============================================================================

/// Table annotator.
///
/// Construct once and reuse: the result cache lives as long as the
/// annotator (or longer, when passed in through [`Annotator::with_parts`]).
#[derive(Debug)]
pub struct Annotator {
    config: AnnotatorConfig,
    cache: ResultCache,
    mappings: Arc<TypeMappingTable>,
    resolver: EntityResolver,
    enhancer: MappingEnhancer,
    relations: ColumnRelationshipAnalyzer,
    uri_patterns: UriPatternAnalyzer,
    extractor: TypeExtractor,
    aggregator: TypeAggregator,
}

impl Annotator {
    /// Annotator over the given clients with a fresh cache and the
    /// built-in tables.
    pub fn new(config: AnnotatorConfig, clients: KnowledgeBases) -> SemtabResult<Self> {
        let cache = ResultCache::new(&config.cache);
        Self::with_parts(
            config,
            clients,
            cache,
            TypeMappingTable::builtin(),
            TypeRelationshipTable::builtin(),
        )
    }

    /// Annotator over the public Wikidata and DBpedia endpoints.
    pub fn connect(config: AnnotatorConfig) -> SemtabResult<Self> {
        config.validate()?;
        let wikidata =
            WikidataClient::new(&config.endpoints, config.entity_search.language.clone())?;
        let dbpedia = DbpediaClient::new(&config.endpoints)?;
        let clients = KnowledgeBases::new(Arc::new(wikidata), Arc::new(dbpedia))?;
        Self::new(config, clients)
    }

    /// Annotator from explicit parts. The clients are wrapped with `cache`
    /// and the configured retry policy.
    pub fn with_parts(
        config: AnnotatorConfig,
        clients: KnowledgeBases,
        cache: ResultCache,
        mappings: TypeMappingTable,
        relationships: TypeRelationshipTable,
    ) -> SemtabResult<Self> {
        config.validate()?;

        let kbs = clients.cached(cache.clone(), config.retry.clone());
        let mappings = Arc::new(mappings);
        let relationships = Arc::new(relationships);

        Ok(Self {
            resolver: EntityResolver::new(kbs.clone(), config.entity_search.clone()),
            enhancer: MappingEnhancer::new(mappings.clone(), config.enhancer.clone()),
            relations: ColumnRelationshipAnalyzer::new(
                relationships.clone(),
                config.relations.clone(),
            ),
            uri_patterns: UriPatternAnalyzer::new(config.uri_analysis.clone()),
            extractor: TypeExtractor::new(kbs, mappings.clone(), config.extraction.clone()),
            aggregator: TypeAggregator::new(
                relationships,
                mappings.clone(),
                config.aggregation.clone(),
            ),
            mappings,
            cache,
            config,
        })
    }

    pub fn config(&self) -> &AnnotatorConfig {
        &self.config
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn resolver(&self) -> &EntityResolver {
        &self.resolver
    }

    /// Hit, miss and eviction counts of the shared result cache.
    pub fn cache_stats(&self) -> CacheReport {
        CacheReport {
            wikidata: self.cache.stats(KnowledgeBase::Wikidata),
            dbpedia: self.cache.stats(KnowledgeBase::DbPedia),
        }
    }

    /// Annotate a table: column types, cell entities and column relations.
    pub async fn annotate(&self, table: &Table) -> SemtabResult<AnnotationReport> {
        if table.column_count() == 0 || table.row_count() == 0 {
            return Err(ValidationError::EmptyInput {
                what: "table".to_string(),
            }
            .into());
        }
        self.resolver.clear_memo();

        let rows = self.config.sample_size.unwrap_or(usize::MAX);
        let column_delay = self.config.entity_search.throttle.column_delay;
        let mut columns: Vec<Vec<EntityCandidate>> = Vec::with_capacity(table.column_count());

        for (index, cells) in table.columns.iter().enumerate() {
            if index > 0 && !column_delay.is_zero() {
                tokio::time::sleep(column_delay).await;
            }
            let sample = &cells[..cells.len().min(rows)];
            let candidates = self.resolver.resolve_column(sample).await;
            debug!(column = index, candidates = candidates.len(), "column candidates");
            columns.push(self.enhancer.enhance(candidates));
        }

        let relations = if self.config.use_column_relations {
            self.relations.analyze(&columns)
        } else {
            Vec::new()
        };
        if self.config.use_uri_analysis {
            self.uri_patterns.analyze(&mut columns);
        }

        let mut column_types = Vec::with_capacity(columns.len());
        for candidates in columns.iter_mut() {
            column_types.push(self.extractor.extract_column_types(candidates).await);
        }

        let mut annotations = self
            .aggregator
            .aggregate(&column_types, &table.headers, &relations);
        annotations.retain(|a| a.confidence >= self.config.confidence_threshold);

        let cells = self.select_cell_entities(&columns, &annotations);

        let stats = self.cache_stats();
        info!(
            columns = table.column_count(),
            annotated_columns = annotations.len(),
            annotated_cells = cells.len(),
            relations = relations.len(),
            wikidata_hit_rate = stats.wikidata.hit_rate(),
            dbpedia_hit_rate = stats.dbpedia.hit_rate(),
            "table annotated"
        );

        Ok(AnnotationReport {
            columns: annotations,
            cells,
            relations,
        })
    }

    /// Column type annotations only.
    pub async fn annotate_columns(&self, table: &Table) -> SemtabResult<Vec<ColumnTypeAnnotation>> {
        Ok(self.annotate(table).await?.columns)
    }

    /// Cell entity annotations only.
    pub async fn annotate_cells(&self, table: &Table) -> SemtabResult<Vec<CellEntityAnnotation>> {
        Ok(self.annotate(table).await?.cells)
    }

    /// One entity per cell: the best candidate carrying the column's type
    /// (or a mapped equivalent), else the best candidate overall.
    fn select_cell_entities(
        &self,
        columns: &[Vec<EntityCandidate>],
        annotations: &[ColumnTypeAnnotation],
    ) -> Vec<CellEntityAnnotation> {
        let assigned: HashMap<usize, &str> = annotations
            .iter()
            .map(|a| (a.column_index, a.assigned_type.uri.as_str()))
            .collect();
        let mut selected = Vec::new();

        for (column, candidates) in columns.iter().enumerate() {
            let mut accepted: HashSet<&str> = HashSet::new();
            if let Some(&type_uri) = assigned.get(&column) {
                accepted.insert(type_uri);
                accepted.extend(self.mappings.equivalents(type_uri).into_iter().map(|eq| eq.uri));
            }

            let mut by_row: BTreeMap<usize, Vec<&EntityCandidate>> = BTreeMap::new();
            for candidate in candidates {
                by_row.entry(candidate.cell.row_index).or_default().push(candidate);
            }

            for (row, row_candidates) in by_row {
                let carrying = row_candidates.iter().copied().filter(|c| {
                    c.types
                        .iter()
                        .any(|t| accepted.contains(t.uri.as_str()))
                });
                let Some(chosen) =
                    highest(carrying).or_else(|| highest(row_candidates.iter().copied()))
                else {
                    continue;
                };
                if chosen.score < self.config.confidence_threshold {
                    continue;
                }
                selected.push(CellEntityAnnotation {
                    row,
                    column: chosen.cell.column_index,
                    uri: chosen.entity.uri.clone(),
                    confidence: chosen.score,
                });
            }
        }

        selected
    }
}

/// Highest-scoring candidate; the first one wins ties.
fn highest<'a>(
    candidates: impl Iterator<Item = &'a EntityCandidate>,
) -> Option<&'a EntityCandidate> {
    candidates.fold(None, |best: Option<&EntityCandidate>, c| match best {
        Some(b) if b.score >= c.score => Some(b),
        _ => Some(c),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use semtab_core::{Cell, SemtabError};
    use semtab_test_utils::fixtures::{candidate, dbo, dbr, fast_config, wd};
    use semtab_test_utils::{stub_pair, StubKnowledgeBase};

    fn annotator() -> Annotator {
        Annotator::new(
            fast_config(),
            stub_pair(
                Arc::new(StubKnowledgeBase::new(KnowledgeBase::Wikidata)),
                Arc::new(StubKnowledgeBase::new(KnowledgeBase::DbPedia)),
            ),
        )
        .unwrap()
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = fast_config();
        config.confidence_threshold = 2.0;
        let result = Annotator::new(
            config,
            stub_pair(
                Arc::new(StubKnowledgeBase::new(KnowledgeBase::Wikidata)),
                Arc::new(StubKnowledgeBase::new(KnowledgeBase::DbPedia)),
            ),
        );
        assert!(matches!(result, Err(SemtabError::Config(_))));
    }

    #[tokio::test]
    async fn test_empty_table_is_rejected() {
        let table = Table {
            headers: Vec::new(),
            columns: Vec::new(),
        };
        let result = annotator().annotate(&table).await;
        assert!(matches!(
            result,
            Err(SemtabError::Validation(ValidationError::EmptyInput { .. }))
        ));
    }

    #[tokio::test]
    async fn test_unknown_values_produce_empty_report() {
        let table = Table::from_rows(
            vec!["a".to_string()],
            vec![vec!["Nowhere".to_string()], vec!["Nothing".to_string()]],
        )
        .unwrap();
        let report = annotator().annotate(&table).await.unwrap();
        assert_eq!(report, AnnotationReport::default());
    }

    #[test]
    fn test_cell_selection_prefers_assigned_type() {
        let annotator = annotator();
        let columns = vec![vec![
            candidate(
                KnowledgeBase::DbPedia,
                Cell::new("Paris", 0, 0),
                &dbr("Paris_Hilton"),
                0.9,
                &[&dbo("Person")],
            ),
            candidate(
                KnowledgeBase::DbPedia,
                Cell::new("Paris", 0, 0),
                &dbr("Paris"),
                0.6,
                &[&dbo("City")],
            ),
            candidate(
                KnowledgeBase::Wikidata,
                Cell::new("Lyon", 1, 0),
                &wd("Q456"),
                0.7,
                &[&wd("Q515")],
            ),
            candidate(
                KnowledgeBase::DbPedia,
                Cell::new("Rex", 2, 0),
                &dbr("Rex"),
                0.8,
                &[&dbo("Film")],
            ),
        ]];
        let annotations = vec![ColumnTypeAnnotation {
            column_index: 0,
            column_header: "city".to_string(),
            assigned_type: semtab_core::SemanticType::from_uri(dbo("City"), KnowledgeBase::DbPedia),
            confidence: 0.8,
            alternative_types: Vec::new(),
        }];

        let cells = annotator.select_cell_entities(&columns, &annotations);
        assert_eq!(cells.len(), 3);
        assert_eq!(cells[0].uri, dbr("Paris"));
        assert_eq!(cells[0].confidence, 0.6);
        // Mapped equivalent of the assigned type.
        assert_eq!(cells[1].uri, wd("Q456"));
        // Nothing carries the type: best overall.
        assert_eq!(cells[2].uri, dbr("Rex"));
        assert_eq!(cells[2].row, 2);
    }

    #[test]
    fn test_cache_report_by_kb() {
        let report = CacheReport {
            wikidata: CacheStats {
                hits: 3,
                ..CacheStats::default()
            },
            dbpedia: CacheStats::default(),
        };
        assert_eq!(report.get(KnowledgeBase::Wikidata).hits, 3);
        assert_eq!(report.get(KnowledgeBase::DbPedia).hits, 0);
    }
}
