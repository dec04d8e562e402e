//! Cross-base mapping boost
//!
//! A candidate whose types agree across both knowledge bases is more
//! credible. Missing counterparts are synthesised so later stages see the
//! type in both vocabularies.

use crate::mapping::TypeMappingTable;
use semtab_core::{EntityCandidate, MappingEnhancerConfig, SemanticType};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Boosts candidates through the type mapping table.
#[derive(Debug, Clone)]
pub struct MappingEnhancer {
    mappings: Arc<TypeMappingTable>,
    config: MappingEnhancerConfig,
}

impl MappingEnhancer {
    pub fn new(mappings: Arc<TypeMappingTable>, config: MappingEnhancerConfig) -> Self {
        Self { mappings, config }
    }

    /// Enhance every candidate of a column.
    pub fn enhance(&self, mut candidates: Vec<EntityCandidate>) -> Vec<EntityCandidate> {
        let mut boosted = 0;
        for candidate in &mut candidates {
            if self.enhance_candidate(candidate) > 0.0 {
                boosted += 1;
            }
        }
        debug!(candidates = candidates.len(), boosted, "mapping enhancement");
        candidates
    }

    /// Enhance one candidate in place. Returns the total score increase.
    ///
    /// Each mapping counts once per candidate, however many of its types
    /// lead to it.
    pub fn enhance_candidate(&self, candidate: &mut EntityCandidate) -> f64 {
        let original: Vec<SemanticType> = candidate.types.clone();
        let mut used = HashSet::new();
        let mut synthesised: Vec<SemanticType> = Vec::new();
        let mut total = 0.0;

        for t in &original {
            for eq in self.mappings.equivalents(&t.uri) {
                if !used.insert(eq.index) {
                    continue;
                }
                let carried =
                    candidate.has_type(eq.uri) || synthesised.iter().any(|s| s.uri == eq.uri);
                if !carried {
                    if t.source != eq.from {
                        continue;
                    }
                    synthesised.push(SemanticType::from_uri(eq.uri, eq.to()));
                }

                let remaining = self.config.max_total_boost - total;
                if remaining > 0.0 {
                    let amount = (eq.confidence * self.config.boost_per_mapping).min(remaining);
                    total += candidate.boost(amount);
                }
            }
        }

        candidate.types.extend(synthesised);
        total
    }
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;
    use semtab_core::{Cell, Entity, KnowledgeBase};

    const TYPES: &[&str] = &[
        "http://www.wikidata.org/entity/Q515",
        "http://www.wikidata.org/entity/Q6256",
        "http://www.wikidata.org/entity/Q5",
        "http://dbpedia.org/ontology/City",
        "http://dbpedia.org/ontology/Country",
        "http://example.org/Unmapped",
    ];

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_boost_within_bounds(
            score in 0.0f64..=1.0,
            picks in proptest::collection::vec(0..TYPES.len(), 0..6),
        ) {
            let types = picks
                .iter()
                .map(|&i| {
                    let source = if TYPES[i].contains("wikidata") {
                        KnowledgeBase::Wikidata
                    } else {
                        KnowledgeBase::DbPedia
                    };
                    SemanticType::from_uri(TYPES[i], source)
                })
                .collect();
            let mut c = EntityCandidate::new(
                Cell::new("v", 0, 0),
                Entity::new("u:e", "v", KnowledgeBase::Wikidata, score),
                types,
            );
            let before = c.score;
            let enhancer = MappingEnhancer::new(
                Arc::new(TypeMappingTable::builtin()),
                MappingEnhancerConfig::default(),
            );
            let boost = enhancer.enhance_candidate(&mut c);

            prop_assert!(c.score >= before);
            prop_assert!(c.score <= 1.0);
            prop_assert!(boost <= 0.3 + 1e-9);
        }
    }
}
