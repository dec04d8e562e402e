//! SemTab Test Utilities
//!
//! Centralized test infrastructure for the SemTab workspace:
//! - A scriptable spy knowledge-base client
//! - Proptest generators for the data model
//! - Test fixtures for common scenarios
//! - Custom assertions for SemTab-specific validation

// Re-export core types for convenience
pub use semtab_core::{
    AnnotatorConfig, Cell, ColumnRelation, ConfigError, Entity, EntityCandidate, KnowledgeBase,
    KnowledgeBaseError, RetryConfig, SemanticType, SemtabError, SemtabResult, Table,
    ThrottleConfig, TypeCandidate, ValidationError,
};
pub use semtab_kb::{KbResult, KnowledgeBaseClient, KnowledgeBases};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

// ============================================================================
// STUB KNOWLEDGE BASE
// ============================================================================

fn stub_key(query: &str) -> String {
    query.trim().to_lowercase()
}

/// In-memory knowledge-base client that records every call.
///
/// Searches match on the trimmed, lowercased query. Unknown queries and
/// URIs answer with empty results, like the real services.
#[derive(Debug)]
pub struct StubKnowledgeBase {
    source: KnowledgeBase,
    entities: HashMap<String, Vec<Entity>>,
    types: HashMap<String, Vec<SemanticType>>,
    parents: HashMap<String, Vec<String>>,
    search_calls: AtomicUsize,
    type_calls: AtomicUsize,
    parent_calls: AtomicUsize,
    pending_failures: AtomicUsize,
    unavailable: AtomicBool,
    searched: Mutex<Vec<String>>,
}

impl StubKnowledgeBase {
    pub fn new(source: KnowledgeBase) -> Self {
        Self {
            source,
            entities: HashMap::new(),
            types: HashMap::new(),
            parents: HashMap::new(),
            search_calls: AtomicUsize::new(0),
            type_calls: AtomicUsize::new(0),
            parent_calls: AtomicUsize::new(0),
            pending_failures: AtomicUsize::new(0),
            unavailable: AtomicBool::new(false),
            searched: Mutex::new(Vec::new()),
        }
    }

    /// Answer `query` with one more entity.
    pub fn with_entity(
        mut self,
        query: &str,
        uri: &str,
        label: &str,
        confidence: f64,
    ) -> Self {
        self.entities
            .entry(stub_key(query))
            .or_default()
            .push(Entity::new(uri, label, self.source, confidence));
        self
    }

    /// Give `entity_uri` these types, labelled from their URIs.
    pub fn with_types(mut self, entity_uri: &str, type_uris: &[&str]) -> Self {
        let types = type_uris
            .iter()
            .map(|uri| SemanticType::from_uri(*uri, self.source))
            .collect();
        self.types.insert(entity_uri.to_string(), types);
        self
    }

    /// Give `type_uri` these immediate parents.
    pub fn with_parents(mut self, type_uri: &str, parent_uris: &[&str]) -> Self {
        self.parents.insert(
            type_uri.to_string(),
            parent_uris.iter().map(|p| p.to_string()).collect(),
        );
        self
    }

    /// Fail the next `n` calls with a transient server error.
    pub fn fail_next(&self, n: usize) {
        self.pending_failures.store(n, Ordering::SeqCst);
    }

    /// Fail every call with a transient server error until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn type_calls(&self) -> usize {
        self.type_calls.load(Ordering::SeqCst)
    }

    pub fn parent_calls(&self) -> usize {
        self.parent_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.search_calls() + self.type_calls() + self.parent_calls()
    }

    /// Queries passed to `search_entities`, in call order.
    pub fn searched_queries(&self) -> Vec<String> {
        self.searched.lock().map(|q| q.clone()).unwrap_or_default()
    }

    fn check_failure(&self) -> KbResult<()> {
        let scripted = self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if scripted || self.unavailable.load(Ordering::SeqCst) {
            return Err(KnowledgeBaseError::RequestFailed {
                kb: self.source,
                status: 503,
                message: "stub unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl KnowledgeBaseClient for StubKnowledgeBase {
    fn source(&self) -> KnowledgeBase {
        self.source
    }

    async fn search_entities(
        &self,
        query: &str,
        _language: Option<&str>,
        limit: usize,
    ) -> KbResult<Vec<Entity>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut searched) = self.searched.lock() {
            searched.push(query.to_string());
        }
        self.check_failure()?;
        Ok(self
            .entities
            .get(&stub_key(query))
            .map(|e| e.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn entity_types(&self, entity_uri: &str) -> KbResult<Vec<SemanticType>> {
        self.type_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        Ok(self.types.get(entity_uri).cloned().unwrap_or_default())
    }

    async fn parent_types(&self, type_uri: &str) -> KbResult<Vec<String>> {
        self.parent_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        Ok(self.parents.get(type_uri).cloned().unwrap_or_default())
    }
}

/// Pair two stubs as the client set handed to the pipeline.
pub fn stub_pair(
    wikidata: Arc<StubKnowledgeBase>,
    dbpedia: Arc<StubKnowledgeBase>,
) -> KnowledgeBases {
    KnowledgeBases::new(wikidata, dbpedia).expect("stubs report their own sources")
}

// ============================================================================
// TRACING
// ============================================================================

static TRACING: Once = Once::new();

/// Install a test-writer subscriber filtered by `RUST_LOG`. Safe to call
/// from every test.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating test data.

    use super::*;
    use proptest::prelude::*;
    use std::time::Duration;

    /// Generate either knowledge base.
    pub fn arb_knowledge_base() -> impl Strategy<Value = KnowledgeBase> {
        prop_oneof![Just(KnowledgeBase::Wikidata), Just(KnowledgeBase::DbPedia)]
    }

    /// Generate a URI in the namespace of `kb`.
    pub fn arb_uri(kb: KnowledgeBase) -> impl Strategy<Value = String> {
        let prefix = match kb {
            KnowledgeBase::Wikidata => "http://www.wikidata.org/entity/Q",
            KnowledgeBase::DbPedia => "http://dbpedia.org/resource/R",
        };
        (1u32..10_000).prop_map(move |n| format!("{}{}", prefix, n))
    }

    /// Generate a type URI from a small shared vocabulary, so candidates
    /// overlap.
    pub fn arb_type_uri(kb: KnowledgeBase) -> impl Strategy<Value = String> {
        let prefix = match kb {
            KnowledgeBase::Wikidata => "http://www.wikidata.org/entity/Q",
            KnowledgeBase::DbPedia => "http://dbpedia.org/ontology/T",
        };
        (1u32..8).prop_map(move |n| format!("{}{}", prefix, n))
    }

    pub fn arb_entity() -> impl Strategy<Value = Entity> {
        arb_knowledge_base().prop_flat_map(|kb| {
            (arb_uri(kb), "[A-Z][a-z]{1,10}", 0.0f64..=1.0)
                .prop_map(move |(uri, label, confidence)| Entity::new(uri, label, kb, confidence))
        })
    }

    pub fn arb_semantic_type(kb: KnowledgeBase) -> impl Strategy<Value = SemanticType> {
        arb_type_uri(kb).prop_map(move |uri| SemanticType::from_uri(uri, kb))
    }

    /// Generate a candidate for a cell of `column`.
    pub fn arb_entity_candidate(column: usize) -> impl Strategy<Value = EntityCandidate> {
        (arb_entity(), 0usize..20, "[A-Za-z ]{1,12}").prop_flat_map(move |(entity, row, value)| {
            let kb = entity.source;
            prop::collection::vec(arb_semantic_type(kb), 0..4).prop_map(move |types| {
                EntityCandidate::new(Cell::new(value.clone(), row, column), entity.clone(), types)
            })
        })
    }

    /// Generate the candidates of one column.
    pub fn arb_column_candidates(
        column: usize,
        max_len: usize,
    ) -> impl Strategy<Value = Vec<EntityCandidate>> {
        prop::collection::vec(arb_entity_candidate(column), 0..max_len)
    }

    pub fn arb_type_candidate() -> impl Strategy<Value = TypeCandidate> {
        (arb_knowledge_base(), 0.0f64..5.0, 1usize..10, 0.0f64..=1.0).prop_flat_map(
            |(kb, score, entity_matches, confidence)| {
                arb_semantic_type(kb).prop_map(move |semantic_type| TypeCandidate {
                    semantic_type,
                    score,
                    entity_matches,
                    confidence,
                })
            },
        )
    }

    /// Generate a valid RetryConfig.
    pub fn arb_retry_config() -> impl Strategy<Value = RetryConfig> {
        (0u32..6, 1u64..1000, 1000u64..60_000, 1.0f64..5.0, 100u64..30_000).prop_map(
            |(max_retries, initial_ms, max_ms, multiplier, timeout_ms)| RetryConfig {
                max_retries,
                initial_backoff: Duration::from_millis(initial_ms),
                max_backoff: Duration::from_millis(max_ms),
                backoff_multiplier: multiplier,
                request_timeout: Duration::from_millis(timeout_ms),
            },
        )
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;
    use std::time::Duration;

    pub const WD: &str = "http://www.wikidata.org/entity/";
    pub const DBR: &str = "http://dbpedia.org/resource/";
    pub const DBO: &str = "http://dbpedia.org/ontology/";
    pub const OWL_THING: &str = "http://www.w3.org/2002/07/owl#Thing";

    pub fn wd(id: &str) -> String {
        format!("{}{}", WD, id)
    }

    pub fn dbr(name: &str) -> String {
        format!("{}{}", DBR, name)
    }

    pub fn dbo(name: &str) -> String {
        format!("{}{}", DBO, name)
    }

    /// Default configuration without throttling delays and with millisecond
    /// backoff.
    pub fn fast_config() -> AnnotatorConfig {
        let mut config = AnnotatorConfig::default();
        config.entity_search.throttle = ThrottleConfig::unthrottled(5);
        config.retry = RetryConfig {
            max_retries: 1,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
            backoff_multiplier: 2.0,
            request_timeout: Duration::from_secs(1),
        };
        config
    }

    /// Two-column table: countries and their capitals.
    pub fn country_city_table() -> Table {
        Table::from_rows(
            vec!["country".to_string(), "capital".to_string()],
            vec![
                vec!["France".to_string(), "Paris".to_string()],
                vec!["Germany".to_string(), "Berlin".to_string()],
            ],
        )
        .expect("fixture table is rectangular")
    }

    /// Wikidata stub that knows the countries and capitals of
    /// [`country_city_table`].
    pub fn country_city_wikidata() -> StubKnowledgeBase {
        let country = wd("Q6256");
        let city = wd("Q515");
        StubKnowledgeBase::new(KnowledgeBase::Wikidata)
            .with_entity("France", &wd("Q142"), "France", 0.9)
            .with_types(&wd("Q142"), &[&country])
            .with_entity("Germany", &wd("Q183"), "Germany", 0.9)
            .with_types(&wd("Q183"), &[&country])
            .with_entity("Paris", &wd("Q90"), "Paris", 0.9)
            .with_types(&wd("Q90"), &[&city])
            .with_entity("Berlin", &wd("Q64"), "Berlin", 0.9)
            .with_types(&wd("Q64"), &[&city])
    }

    /// DBpedia stub that knows the countries and capitals of
    /// [`country_city_table`].
    pub fn country_city_dbpedia() -> StubKnowledgeBase {
        let country = dbo("Country");
        let city = dbo("City");
        StubKnowledgeBase::new(KnowledgeBase::DbPedia)
            .with_entity("France", &dbr("France"), "France", 0.85)
            .with_types(&dbr("France"), &[&country])
            .with_entity("Germany", &dbr("Germany"), "Germany", 0.85)
            .with_types(&dbr("Germany"), &[&country])
            .with_entity("Paris", &dbr("Paris"), "Paris", 0.85)
            .with_types(&dbr("Paris"), &[&city])
            .with_entity("Berlin", &dbr("Berlin"), "Berlin", 0.85)
            .with_types(&dbr("Berlin"), &[&city])
    }

    /// Stub whose only answer for `value` carries nothing but `owl:Thing`.
    pub fn thing_only(kb: KnowledgeBase, value: &str) -> StubKnowledgeBase {
        let uri = match kb {
            KnowledgeBase::Wikidata => wd("Q999999"),
            KnowledgeBase::DbPedia => dbr(&value.replace(' ', "_")),
        };
        StubKnowledgeBase::new(kb)
            .with_entity(value, &uri, value, 0.9)
            .with_types(&uri, &[OWL_THING])
    }

    /// A candidate with the given types, all from `kb`.
    pub fn candidate(
        kb: KnowledgeBase,
        cell: Cell,
        entity_uri: &str,
        confidence: f64,
        type_uris: &[&str],
    ) -> EntityCandidate {
        let entity = Entity::new(entity_uri, cell.value.clone(), kb, confidence);
        let types = type_uris
            .iter()
            .map(|uri| SemanticType::from_uri(*uri, kb))
            .collect();
        EntityCandidate::new(cell, entity, types)
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Custom assertion functions for SemTab-specific validation.

    use super::*;

    /// Assert that a SemtabResult is a Config error.
    #[track_caller]
    pub fn assert_config_error<T: std::fmt::Debug>(result: &SemtabResult<T>) {
        match result {
            Err(SemtabError::Config(_)) => {}
            other => panic!("Expected Config error, got: {:?}", other),
        }
    }

    /// Assert that a SemtabResult is an InvalidValue config error for `field`.
    #[track_caller]
    pub fn assert_invalid_config_field<T: std::fmt::Debug>(result: &SemtabResult<T>, field: &str) {
        match result {
            Err(SemtabError::Config(ConfigError::InvalidValue { field: f, .. })) => {
                assert_eq!(f, field, "Wrong field in InvalidValue error");
            }
            other => panic!("Expected InvalidValue for {}, got: {:?}", field, other),
        }
    }

    /// Assert that a SemtabResult is a Validation error.
    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &SemtabResult<T>) {
        match result {
            Err(SemtabError::Validation(_)) => {}
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    /// Assert that every candidate score lies in [0, 1].
    #[track_caller]
    pub fn assert_score_bounds(candidates: &[EntityCandidate]) {
        for c in candidates {
            assert!(
                (0.0..=1.0).contains(&c.score),
                "Score {} of {} out of bounds",
                c.score,
                c.entity.uri
            );
        }
    }

    /// Assert that every type confidence lies in [0, 1].
    #[track_caller]
    pub fn assert_confidence_bounds(candidates: &[TypeCandidate]) {
        for c in candidates {
            assert!(
                (0.0..=1.0).contains(&c.confidence),
                "Confidence {} of {} out of bounds",
                c.confidence,
                c.semantic_type.uri
            );
        }
    }

    /// Assert that type candidates are ranked by descending score.
    #[track_caller]
    pub fn assert_sorted_by_score(candidates: &[TypeCandidate]) {
        for pair in candidates.windows(2) {
            assert!(
                pair[0].score >= pair[1].score,
                "{} ({}) ranked above {} ({})",
                pair[0].semantic_type.uri,
                pair[0].score,
                pair[1].semantic_type.uri,
                pair[1].score
            );
        }
    }

    /// Assert that type candidates are ranked by descending confidence.
    #[track_caller]
    pub fn assert_sorted_by_confidence(candidates: &[TypeCandidate]) {
        for pair in candidates.windows(2) {
            assert!(
                pair[0].confidence >= pair[1].confidence,
                "{} ({}) ranked above {} ({})",
                pair[0].semantic_type.uri,
                pair[0].confidence,
                pair[1].semantic_type.uri,
                pair[1].confidence
            );
        }
    }

    /// Assert that relations are ranked by descending confidence.
    #[track_caller]
    pub fn assert_relations_sorted(relations: &[ColumnRelation]) {
        for pair in relations.windows(2) {
            assert!(
                pair[0].confidence >= pair[1].confidence,
                "Relations out of order: {} before {}",
                pair[0].confidence,
                pair[1].confidence
            );
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
