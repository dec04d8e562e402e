//! Final column type selection
//!
//! Column relations act as a tie-breaker: a type that fits a relation with
//! its neighbour column gets a confidence boost before ranking.

use crate::mapping::TypeMappingTable;
use crate::relationships::TypeRelationshipTable;
use semtab_core::{
    clamp_unit, AggregationConfig, ColumnRelation, ColumnTypeAnnotation, TypeCandidate,
};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct TypeAggregator {
    relationships: Arc<TypeRelationshipTable>,
    mappings: Arc<TypeMappingTable>,
    config: AggregationConfig,
}

/// Highest-confidence candidate; the first one wins ties.
fn best(candidates: &[TypeCandidate]) -> Option<&TypeCandidate> {
    candidates.iter().fold(None, |best: Option<&TypeCandidate>, c| match best {
        Some(b) if b.confidence >= c.confidence => Some(b),
        _ => Some(c),
    })
}

impl TypeAggregator {
    pub fn new(
        relationships: Arc<TypeRelationshipTable>,
        mappings: Arc<TypeMappingTable>,
        config: AggregationConfig,
    ) -> Self {
        Self {
            relationships,
            mappings,
            config,
        }
    }

    /// One annotation per column with at least one type candidate.
    ///
    /// `column_types[i]` holds the candidates of column `i`; `headers` may
    /// be shorter than the column list.
    pub fn aggregate(
        &self,
        column_types: &[Vec<TypeCandidate>],
        headers: &[String],
        relations: &[ColumnRelation],
    ) -> Vec<ColumnTypeAnnotation> {
        let mut annotations = Vec::new();

        for (column, candidates) in column_types.iter().enumerate() {
            if candidates.is_empty() {
                debug!(column, "no type candidates, column skipped");
                continue;
            }
            let mut ranked = candidates.clone();

            for rel in relations.iter().filter(|r| r.touches(column)) {
                let local_is_source = rel.source_column == column;
                let related = if local_is_source {
                    rel.target_column
                } else {
                    rel.source_column
                };
                if related == column {
                    continue;
                }
                let related_best = column_types
                    .get(related)
                    .and_then(|c| best(c))
                    .map(|c| c.semantic_type.uri.as_str());
                let boost = self.config.relation_boost_factor * rel.confidence;

                for candidate in &mut ranked {
                    if self.relationships.is_compatible(
                        &self.mappings,
                        rel.relation_type.as_deref(),
                        &candidate.semantic_type.uri,
                        related_best,
                        local_is_source,
                    ) {
                        candidate.confidence = clamp_unit(candidate.confidence + boost);
                    }
                }
            }

            ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
            let mut ranked = ranked.into_iter();
            let Some(top) = ranked.next() else {
                continue;
            };
            debug!(
                column,
                assigned = %top.semantic_type.uri,
                confidence = top.confidence,
                "column type assigned"
            );
            annotations.push(ColumnTypeAnnotation {
                column_index: column,
                column_header: headers.get(column).cloned().unwrap_or_default(),
                assigned_type: top.semantic_type,
                confidence: top.confidence,
                alternative_types: ranked.collect(),
            });
        }

        annotations
    }
}
