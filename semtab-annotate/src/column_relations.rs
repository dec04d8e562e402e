//! Column relationship inference
//!
//! Two columns are related when the types that dominate them are linked in
//! the relationship table. Evidence is weighted by how much of each column
//! carries the type.

use crate::relationships::TypeRelationshipTable;
use semtab_core::{clamp_unit, ColumnRelation, EntityCandidate, RelationAnalysisConfig};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Weighted type frequencies of one column: type URI to summed score.
pub fn type_distribution(candidates: &[EntityCandidate]) -> BTreeMap<&str, f64> {
    let mut distribution = BTreeMap::new();
    for candidate in candidates {
        let mut seen = HashSet::new();
        for t in &candidate.types {
            if seen.insert(t.uri.as_str()) {
                *distribution.entry(t.uri.as_str()).or_insert(0.0) += candidate.score;
            }
        }
    }
    distribution
}

/// Infers relations between the columns of one table.
#[derive(Debug, Clone)]
pub struct ColumnRelationshipAnalyzer {
    relationships: Arc<TypeRelationshipTable>,
    config: RelationAnalysisConfig,
}

impl ColumnRelationshipAnalyzer {
    pub fn new(relationships: Arc<TypeRelationshipTable>, config: RelationAnalysisConfig) -> Self {
        Self {
            relationships,
            config,
        }
    }

    /// Relations between every ordered pair of non-empty columns.
    ///
    /// `columns[i]` holds the candidates of column `i`. A relation name is
    /// reported once per ordered column pair: when several type pairs (for
    /// example one per vocabulary) yield the same name, only the highest
    /// confidence is kept. The result is sorted by confidence, highest
    /// first, with at most `max_relations_per_column` entries per source
    /// column.
    pub fn analyze(&self, columns: &[Vec<EntityCandidate>]) -> Vec<ColumnRelation> {
        let distributions: Vec<_> = columns.iter().map(|c| type_distribution(c)).collect();
        let mut found: Vec<ColumnRelation> = Vec::new();
        let mut positions: HashMap<(usize, usize, String), usize> = HashMap::new();

        for (i, source) in distributions.iter().enumerate() {
            if columns[i].is_empty() {
                continue;
            }
            let source_total = columns[i].len() as f64;

            for (j, target) in distributions.iter().enumerate() {
                if i == j || columns[j].is_empty() {
                    continue;
                }
                let target_total = columns[j].len() as f64;

                for (&source_type, &source_freq) in source {
                    for (&target_type, &target_freq) in target {
                        for rel in self.relationships.between(source_type, target_type) {
                            let confidence = clamp_unit(
                                rel.confidence
                                    * (source_freq / source_total)
                                    * (target_freq / target_total),
                            );
                            if confidence < self.config.min_relation_confidence {
                                continue;
                            }

                            // Same relation found through both vocabularies: keep the stronger.
                            let key = (i, j, rel.relation_name.clone());
                            match positions.get(&key) {
                                Some(&p) => {
                                    if confidence > found[p].confidence {
                                        found[p].confidence = confidence;
                                    }
                                }
                                None => {
                                    positions.insert(key, found.len());
                                    found.push(ColumnRelation {
                                        source_column: i,
                                        target_column: j,
                                        relation_type: Some(rel.relation_name.clone()),
                                        confidence,
                                    });
                                }
                            }
                        }
                    }
                }
            }
        }

        found.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        let mut per_source: HashMap<usize, usize> = HashMap::new();
        found.retain(|rel| {
            let count = per_source.entry(rel.source_column).or_insert(0);
            *count += 1;
            *count <= self.config.max_relations_per_column
        });

        debug!(columns = columns.len(), relations = found.len(), "column relations");
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semtab_core::{Cell, Entity, KnowledgeBase, SemanticType, TypeRelationship};

    const DBO: &str = "http://dbpedia.org/ontology/";

    fn candidate(column: usize, row: usize, score: f64, types: &[&str]) -> EntityCandidate {
        EntityCandidate::new(
            Cell::new(format!("v{row}"), row, column),
            Entity::new(
                format!("http://dbpedia.org/resource/E{column}_{row}"),
                "v",
                KnowledgeBase::DbPedia,
                score,
            ),
            types
                .iter()
                .map(|t| SemanticType::from_uri(format!("{DBO}{t}"), KnowledgeBase::DbPedia))
                .collect(),
        )
    }

    fn analyzer(config: RelationAnalysisConfig) -> ColumnRelationshipAnalyzer {
        ColumnRelationshipAnalyzer::new(Arc::new(TypeRelationshipTable::builtin()), config)
    }

    #[test]
    fn test_distribution_is_weighted_by_score() {
        let column = vec![
            candidate(0, 0, 0.5, &["City", "City"]),
            candidate(0, 1, 0.25, &["City", "Settlement"]),
        ];
        let distribution = type_distribution(&column);
        assert_eq!(distribution[format!("{DBO}City").as_str()], 0.75);
        assert_eq!(distribution[format!("{DBO}Settlement").as_str()], 0.25);
    }

    #[test]
    fn test_country_city_relation() {
        let columns = vec![
            vec![
                candidate(0, 0, 1.0, &["Country"]),
                candidate(0, 1, 1.0, &["Country"]),
            ],
            vec![candidate(1, 0, 1.0, &["City"]), candidate(1, 1, 0.5, &["City"])],
        ];
        let relations = analyzer(RelationAnalysisConfig::default()).analyze(&columns);

        let capital = relations
            .iter()
            .find(|r| r.relation_type.as_deref() == Some("hasCapital"))
            .unwrap();
        assert_eq!(capital.source_column, 0);
        assert_eq!(capital.target_column, 1);
        // 0.9 * (2 / 2) * (1.5 / 2)
        assert!((capital.confidence - 0.675).abs() < 1e-9);
    }

    #[test]
    fn test_empty_columns_are_skipped() {
        let columns = vec![vec![candidate(0, 0, 1.0, &["Country"])], vec![]];
        assert!(analyzer(RelationAnalysisConfig::default())
            .analyze(&columns)
            .is_empty());
    }

    #[test]
    fn test_duplicate_names_keep_the_strongest() {
        let table = TypeRelationshipTable::from_entries(vec![
            TypeRelationship::new(format!("{DBO}A"), format!("{DBO}B"), "r", 0.5),
            TypeRelationship::new(format!("{DBO}A2"), format!("{DBO}B"), "r", 0.9),
        ]);
        let analyzer =
            ColumnRelationshipAnalyzer::new(Arc::new(table), RelationAnalysisConfig::default());
        let columns = vec![
            vec![candidate(0, 0, 1.0, &["A", "A2"])],
            vec![candidate(1, 0, 1.0, &["B"])],
        ];
        let relations = analyzer.analyze(&columns);
        assert_eq!(relations.len(), 1);
        assert!((relations[0].confidence - 0.9).abs() < 1e-9);
    }
}
