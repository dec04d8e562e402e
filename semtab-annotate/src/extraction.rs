//! Type Extraction - voting column types from entity candidates
//!
//! Each distinct entity votes for its types with its score, and for their
//! immediate parents at a reduced weight. Votes are then expressed in one
//! target vocabulary through the type mapping table.

use crate::mapping::TypeMappingTable;
use futures_util::future::join_all;
use once_cell::sync::Lazy;
use semtab_core::{
    clamp_unit, EntityCandidate, KnowledgeBase, SemanticType, TypeCandidate,
    TypeExtractionConfig,
};
use semtab_kb::KnowledgeBases;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Top-level classes that say nothing about a column.
static TOO_GENERAL: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "http://www.w3.org/2002/07/owl#Thing",
        "http://www.w3.org/2000/01/rdf-schema#Resource",
        "http://www.w3.org/2000/01/rdf-schema#Class",
        "http://schema.org/Thing",
        "https://schema.org/Thing",
        "http://www.wikidata.org/entity/Q35120",
        "http://www.wikidata.org/entity/Q488383",
        "http://www.wikidata.org/entity/Q223557",
        "http://www.wikidata.org/entity/Q151885",
        "http://www.wikidata.org/entity/Q7184903",
    ]
    .into_iter()
    .collect()
});

/// Whether a type is on the exclusion list.
pub fn is_too_general(type_uri: &str) -> bool {
    TOO_GENERAL.contains(type_uri)
}

/// Vote accumulator for one type.
struct Tally {
    semantic_type: SemanticType,
    score: f64,
    entity_matches: usize,
}

/// Extracts ranked type candidates for a column.
#[derive(Debug, Clone)]
pub struct TypeExtractor {
    kbs: KnowledgeBases,
    mappings: Arc<TypeMappingTable>,
    config: TypeExtractionConfig,
}

impl TypeExtractor {
    pub fn new(
        kbs: KnowledgeBases,
        mappings: Arc<TypeMappingTable>,
        config: TypeExtractionConfig,
    ) -> Self {
        Self {
            kbs,
            mappings,
            config,
        }
    }

    /// Ranked type candidates for one column, in the target vocabulary.
    ///
    /// Parent types fetched along the way are stored on the candidates'
    /// types, so a second call does not fetch them again.
    pub async fn extract_column_types(
        &self,
        candidates: &mut [EntityCandidate],
    ) -> Vec<TypeCandidate> {
        let total = candidates.len();
        if total == 0 {
            return Vec::new();
        }

        let voters = best_per_entity(candidates);
        if self.config.expand_parents {
            self.resolve_parents(candidates, &voters).await;
        }

        let mut tallies: Vec<Tally> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut vote = |semantic_type: &SemanticType, weight: f64| {
            if let Some(&p) = positions.get(&semantic_type.uri) {
                tallies[p].score += weight;
                tallies[p].entity_matches += 1;
                return;
            }
            positions.insert(semantic_type.uri.clone(), tallies.len());
            tallies.push(Tally {
                semantic_type: SemanticType {
                    parent_types: None,
                    ..semantic_type.clone()
                },
                score: weight,
                entity_matches: 1,
            });
        };

        for &i in &voters {
            let candidate = &candidates[i];
            let direct: Vec<&SemanticType> = unique_types(&candidate.types)
                .into_iter()
                .filter(|t| !is_too_general(&t.uri))
                .collect();
            let direct_uris: HashSet<&str> = direct.iter().map(|t| t.uri.as_str()).collect();

            for &t in &direct {
                vote(t, candidate.score);
            }

            if !self.config.expand_parents {
                continue;
            }
            let mut credited: HashSet<&str> = HashSet::new();
            for &t in &direct {
                for parent in t.parent_types.iter().flatten() {
                    if is_too_general(parent)
                        || direct_uris.contains(parent.as_str())
                        || !credited.insert(parent.as_str())
                    {
                        continue;
                    }
                    vote(
                        &SemanticType::from_uri(parent.as_str(), t.source),
                        self.config.parent_weight * candidate.score,
                    );
                }
            }
        }

        let mut ranked: Vec<TypeCandidate> = tallies
            .into_iter()
            .map(|tally| TypeCandidate {
                semantic_type: tally.semantic_type,
                score: tally.score,
                entity_matches: tally.entity_matches,
                confidence: clamp_unit(tally.score / total as f64),
            })
            .filter(|c| c.confidence >= self.config.min_type_confidence)
            .collect();
        sort_by_score(&mut ranked);
        ranked.truncate(self.config.max_types_per_column);

        let normalized = self.normalize(ranked);
        debug!(
            candidates = total,
            entities = voters.len(),
            types = normalized.len(),
            "column types extracted"
        );
        normalized
    }

    /// Fetch and store parents for every voting type that lacks them.
    async fn resolve_parents(&self, candidates: &mut [EntityCandidate], voters: &[usize]) {
        let mut pending: Vec<(String, KnowledgeBase)> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for &i in voters {
            for t in &candidates[i].types {
                if t.parent_types.is_none() && !is_too_general(&t.uri) && seen.insert(t.uri.clone())
                {
                    pending.push((t.uri.clone(), t.source));
                }
            }
        }
        if pending.is_empty() {
            return;
        }

        let fetched = join_all(pending.iter().map(|(uri, source)| async move {
            let result = self.kbs.get(*source).parent_types(uri).await;
            (uri.as_str(), *source, result)
        }))
        .await;

        let mut parents: HashMap<&str, Vec<String>> = HashMap::new();
        for (uri, source, result) in fetched {
            match result {
                Ok(found) => {
                    parents.insert(uri, found);
                }
                Err(e) => {
                    warn!(kb = %source, uri = %uri, error = %e, "parent lookup failed");
                }
            }
        }

        for candidate in candidates.iter_mut() {
            for t in &mut candidate.types {
                if t.parent_types.is_none() {
                    if let Some(found) = parents.get(t.uri.as_str()) {
                        t.parent_types = Some(found.clone());
                    }
                }
            }
        }
    }

    /// Express ranked types in the target vocabulary.
    ///
    /// Native types get a proportional boost; foreign types are replaced by
    /// their mapped equivalents. The input comes back unchanged when nothing
    /// maps into the target vocabulary.
    pub fn normalize(&self, ranked: Vec<TypeCandidate>) -> Vec<TypeCandidate> {
        let target = self.config.target_vocabulary;
        let mut normalized: Vec<TypeCandidate> = Vec::new();
        let mut present: HashSet<String> = HashSet::new();

        for candidate in ranked.iter().filter(|c| c.semantic_type.source == target) {
            let boosted = candidate.confidence * (1.0 + self.config.normalization_boost);
            present.insert(candidate.semantic_type.uri.clone());
            normalized.push(TypeCandidate {
                confidence: clamp_unit(boosted),
                ..candidate.clone()
            });
        }

        for candidate in ranked.iter().filter(|c| c.semantic_type.source != target) {
            for eq in self
                .mappings
                .equivalents_in(&candidate.semantic_type.uri, target)
            {
                if !present.insert(eq.uri.to_string()) {
                    continue;
                }
                normalized.push(TypeCandidate {
                    semantic_type: SemanticType::from_uri(eq.uri, target),
                    score: candidate.score * eq.confidence,
                    entity_matches: candidate.entity_matches,
                    confidence: clamp_unit(candidate.confidence * eq.confidence),
                });
            }
        }

        if normalized.is_empty() {
            return ranked;
        }
        sort_by_score(&mut normalized);
        normalized
    }
}

/// Index of the highest-scoring candidate per entity URI, in first-seen order.
fn best_per_entity(candidates: &[EntityCandidate]) -> Vec<usize> {
    let mut best: Vec<usize> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for (i, candidate) in candidates.iter().enumerate() {
        match positions.get(candidate.entity.uri.as_str()) {
            Some(&p) => {
                if candidate.score > candidates[best[p]].score {
                    best[p] = i;
                }
            }
            None => {
                positions.insert(candidate.entity.uri.as_str(), best.len());
                best.push(i);
            }
        }
    }
    best
}

fn unique_types(types: &[SemanticType]) -> Vec<&SemanticType> {
    let mut seen = HashSet::new();
    types.iter().filter(|t| seen.insert(t.uri.as_str())).collect()
}

/// Score descending, ties by URI.
fn sort_by_score(candidates: &mut [TypeCandidate]) {
    candidates.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.semantic_type.uri.cmp(&b.semantic_type.uri))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use semtab_core::Cell;
    use semtab_test_utils::assertions::{assert_confidence_bounds, assert_sorted_by_score};
    use semtab_test_utils::fixtures::{candidate, dbo, wd, OWL_THING};
    use semtab_test_utils::{stub_pair, StubKnowledgeBase};

    fn extractor_with(
        wikidata: StubKnowledgeBase,
        dbpedia: StubKnowledgeBase,
        config: TypeExtractionConfig,
    ) -> (TypeExtractor, Arc<StubKnowledgeBase>, Arc<StubKnowledgeBase>) {
        let wikidata = Arc::new(wikidata);
        let dbpedia = Arc::new(dbpedia);
        let extractor = TypeExtractor::new(
            stub_pair(wikidata.clone(), dbpedia.clone()),
            Arc::new(TypeMappingTable::builtin()),
            config,
        );
        (extractor, wikidata, dbpedia)
    }

    fn extractor() -> TypeExtractor {
        extractor_with(
            StubKnowledgeBase::new(KnowledgeBase::Wikidata),
            StubKnowledgeBase::new(KnowledgeBase::DbPedia),
            TypeExtractionConfig::default(),
        )
        .0
    }

    fn cell(row: usize) -> Cell {
        Cell::new(format!("v{row}"), row, 0)
    }

    #[tokio::test]
    async fn test_votes_are_weighted_and_normalised() {
        let mut candidates = vec![
            candidate(KnowledgeBase::DbPedia, cell(0), "e:1", 0.8, &[&dbo("City")]),
            candidate(KnowledgeBase::DbPedia, cell(1), "e:2", 0.6, &[&dbo("City")]),
            candidate(KnowledgeBase::DbPedia, cell(2), "e:3", 0.4, &[&dbo("Town")]),
        ];
        let types = extractor().extract_column_types(&mut candidates).await;

        assert_eq!(types[0].semantic_type.uri, dbo("City"));
        assert_eq!(types[0].entity_matches, 2);
        assert!((types[0].score - 1.4).abs() < 1e-9);
        // 1.4 / 3, plus the native-vocabulary boost.
        assert!((types[0].confidence - 1.4 / 3.0 * 1.1).abs() < 1e-9);
        assert_eq!(types[1].semantic_type.uri, dbo("Town"));
        assert_sorted_by_score(&types);
        assert_confidence_bounds(&types);
    }

    #[tokio::test]
    async fn test_duplicate_entities_vote_once() {
        let mut candidates = vec![
            candidate(KnowledgeBase::DbPedia, cell(0), "e:1", 0.5, &[&dbo("City")]),
            candidate(KnowledgeBase::DbPedia, cell(1), "e:1", 0.9, &[&dbo("City")]),
        ];
        let types = extractor().extract_column_types(&mut candidates).await;
        assert_eq!(types[0].entity_matches, 1);
        assert!((types[0].score - 0.9).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_too_general_types_do_not_vote() {
        let mut candidates = vec![candidate(
            KnowledgeBase::DbPedia,
            cell(0),
            "e:1",
            0.9,
            &[OWL_THING],
        )];
        let (extractor, _, dbpedia) = extractor_with(
            StubKnowledgeBase::new(KnowledgeBase::Wikidata),
            StubKnowledgeBase::new(KnowledgeBase::DbPedia),
            TypeExtractionConfig::default(),
        );
        assert!(extractor.extract_column_types(&mut candidates).await.is_empty());
        assert_eq!(dbpedia.parent_calls(), 0);
    }

    #[tokio::test]
    async fn test_parents_vote_at_reduced_weight_and_are_cached() {
        let (extractor, _, dbpedia) = extractor_with(
            StubKnowledgeBase::new(KnowledgeBase::Wikidata),
            StubKnowledgeBase::new(KnowledgeBase::DbPedia)
                .with_parents(&dbo("City"), &[&dbo("Settlement"), OWL_THING]),
            TypeExtractionConfig::default(),
        );
        let mut candidates = vec![
            candidate(KnowledgeBase::DbPedia, cell(0), "e:1", 1.0, &[&dbo("City")]),
            candidate(KnowledgeBase::DbPedia, cell(1), "e:2", 1.0, &[&dbo("City")]),
        ];

        let types = extractor.extract_column_types(&mut candidates).await;
        let settlement = types
            .iter()
            .find(|t| t.semantic_type.uri == dbo("Settlement"))
            .unwrap();
        assert!((settlement.score - 1.4).abs() < 1e-9);
        assert!(types.iter().all(|t| !is_too_general(&t.semantic_type.uri)));
        assert_eq!(dbpedia.parent_calls(), 1);
        assert!(candidates
            .iter()
            .all(|c| c.types[0].parent_types.as_deref().is_some_and(|p| p.len() == 2)));

        extractor.extract_column_types(&mut candidates).await;
        assert_eq!(dbpedia.parent_calls(), 1);
    }

    #[tokio::test]
    async fn test_foreign_types_are_mapped() {
        let mut candidates = vec![
            candidate(KnowledgeBase::Wikidata, cell(0), "e:1", 0.9, &[&wd("Q6256")]),
            candidate(KnowledgeBase::Wikidata, cell(1), "e:2", 0.9, &[&wd("Q3624078")]),
        ];
        let types = extractor().extract_column_types(&mut candidates).await;

        assert_eq!(types.len(), 1);
        assert_eq!(types[0].semantic_type.uri, dbo("Country"));
        assert_eq!(types[0].semantic_type.source, KnowledgeBase::DbPedia);
    }

    #[tokio::test]
    async fn test_unmappable_types_fall_back() {
        let mut candidates = vec![candidate(
            KnowledgeBase::Wikidata,
            cell(0),
            "e:1",
            0.9,
            &[&wd("Q123456789")],
        )];
        let types = extractor().extract_column_types(&mut candidates).await;
        assert_eq!(types.len(), 1);
        assert_eq!(types[0].semantic_type.uri, wd("Q123456789"));
    }

    #[tokio::test]
    async fn test_parent_failure_is_not_fatal() {
        let (extractor, _, dbpedia) = extractor_with(
            StubKnowledgeBase::new(KnowledgeBase::Wikidata),
            StubKnowledgeBase::new(KnowledgeBase::DbPedia),
            TypeExtractionConfig::default(),
        );
        dbpedia.set_unavailable(true);
        let mut candidates = vec![candidate(
            KnowledgeBase::DbPedia,
            cell(0),
            "e:1",
            0.9,
            &[&dbo("City")],
        )];
        let types = extractor.extract_column_types(&mut candidates).await;
        assert_eq!(types[0].semantic_type.uri, dbo("City"));
        assert!(candidates[0].types[0].parent_types.is_none());
    }

    #[test]
    fn test_too_general_list() {
        assert!(is_too_general("http://www.w3.org/2002/07/owl#Thing"));
        assert!(is_too_general("http://www.wikidata.org/entity/Q35120"));
        assert!(!is_too_general("http://dbpedia.org/ontology/City"));
    }

    #[test]
    fn test_sort_by_score_breaks_ties_by_uri() {
        let candidate = |uri: &str, score: f64| TypeCandidate {
            semantic_type: SemanticType::from_uri(uri, KnowledgeBase::DbPedia),
            score,
            entity_matches: 1,
            confidence: score,
        };
        let mut ranked = vec![candidate("b", 0.5), candidate("c", 0.9), candidate("a", 0.5)];
        sort_by_score(&mut ranked);
        let uris: Vec<_> = ranked.iter().map(|c| c.semantic_type.uri.as_str()).collect();
        assert_eq!(uris, vec!["c", "a", "b"]);
    }
}
