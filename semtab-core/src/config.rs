//! Configuration types
//!
//! One typed section per pipeline component. Every section has documented
//! defaults, deserializes from partial TOML (missing keys keep their
//! defaults, unknown keys are rejected) and validates its ranges.
//! Durations are expressed in milliseconds on the wire.

use crate::error::invalid_config;
use crate::{ConfigError, KnowledgeBase, SemtabError, SemtabResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

mod opt_duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}

fn check_unit(field: &str, value: f64) -> SemtabResult<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(invalid_config(field, value, "must be between 0.0 and 1.0"));
    }
    Ok(())
}

fn check_nonzero(field: &str, value: usize) -> SemtabResult<()> {
    if value == 0 {
        return Err(invalid_config(field, value, "must be greater than 0"));
    }
    Ok(())
}

fn check_url(field: &str, value: &str) -> SemtabResult<()> {
    if !(value.starts_with("http://") || value.starts_with("https://")) {
        return Err(invalid_config(field, value, "must be an http(s) URL"));
    }
    Ok(())
}

// ============================================================================
// RESULT CACHE
// ============================================================================

/// Bounds for one knowledge base's cache partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheLimits {
    pub max_entries: usize,
    /// Entries older than this are treated as absent. `None` disables ageing.
    #[serde(
        rename = "max_age_ms",
        with = "opt_duration_ms",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_age: Option<Duration>,
}

impl Default for CacheLimits {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            max_age: Some(Duration::from_secs(3600)),
        }
    }
}

/// Cache bounds per knowledge base.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSettings {
    pub wikidata: CacheLimits,
    pub dbpedia: CacheLimits,
}

impl CacheSettings {
    pub fn limits(&self, kb: KnowledgeBase) -> &CacheLimits {
        match kb {
            KnowledgeBase::Wikidata => &self.wikidata,
            KnowledgeBase::DbPedia => &self.dbpedia,
        }
    }

    pub fn validate(&self) -> SemtabResult<()> {
        for kb in KnowledgeBase::ALL {
            let limits = self.limits(kb);
            check_nonzero(&format!("cache.{}.max_entries", kb), limits.max_entries)?;
            if limits.max_age.is_some_and(|age| age.is_zero()) {
                return Err(invalid_config(
                    &format!("cache.{}.max_age_ms", kb),
                    0,
                    "max_age must be positive when set",
                ));
            }
        }
        Ok(())
    }
}

// ============================================================================
// ENDPOINTS
// ============================================================================

/// HTTP endpoints of the two knowledge bases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EndpointConfig {
    pub wikidata_api: String,
    pub wikidata_sparql: String,
    pub dbpedia_lookup: String,
    pub dbpedia_sparql: String,
    pub user_agent: String,
    pub requests_per_minute: u32,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            wikidata_api: "https://www.wikidata.org/w/api.php".to_string(),
            wikidata_sparql: "https://query.wikidata.org/sparql".to_string(),
            dbpedia_lookup: "https://lookup.dbpedia.org/api/search".to_string(),
            dbpedia_sparql: "https://dbpedia.org/sparql".to_string(),
            user_agent: concat!("semtab/", env!("CARGO_PKG_VERSION")).to_string(),
            requests_per_minute: 120,
        }
    }
}

impl EndpointConfig {
    pub fn validate(&self) -> SemtabResult<()> {
        check_url("endpoints.wikidata_api", &self.wikidata_api)?;
        check_url("endpoints.wikidata_sparql", &self.wikidata_sparql)?;
        check_url("endpoints.dbpedia_lookup", &self.dbpedia_lookup)?;
        check_url("endpoints.dbpedia_sparql", &self.dbpedia_sparql)?;
        if self.user_agent.trim().is_empty() {
            return Err(invalid_config("endpoints.user_agent", "", "must not be empty"));
        }
        if self.requests_per_minute == 0 {
            return Err(invalid_config(
                "endpoints.requests_per_minute",
                0,
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// RETRY
// ============================================================================

/// Retry configuration for knowledge-base calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    #[serde(rename = "initial_backoff_ms", with = "duration_ms")]
    pub initial_backoff: Duration,
    #[serde(rename = "max_backoff_ms", with = "duration_ms")]
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
    /// Hard limit for a single attempt.
    #[serde(rename = "request_timeout_ms", with = "duration_ms")]
    pub request_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            request_timeout: Duration::from_secs(15),
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `attempt + 1`:
    /// `initial_backoff * multiplier^attempt`, capped at `max_backoff`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(attempt.min(30) as i32);
        let millis = self.initial_backoff.as_millis() as f64 * factor;
        let capped = millis.min(self.max_backoff.as_millis() as f64);
        Duration::from_millis(capped.max(0.0) as u64)
    }

    pub fn validate(&self) -> SemtabResult<()> {
        if self.backoff_multiplier < 1.0 {
            return Err(invalid_config(
                "retry.backoff_multiplier",
                self.backoff_multiplier,
                "backoff_multiplier must be >= 1.0",
            ));
        }
        if self.max_backoff < self.initial_backoff {
            return Err(invalid_config(
                "retry.max_backoff_ms",
                self.max_backoff.as_millis(),
                "max_backoff must be >= initial_backoff",
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(invalid_config(
                "retry.request_timeout_ms",
                0,
                "request_timeout must be positive",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// ENTITY SEARCH
// ============================================================================

/// Cooperative throttle applied while resolving a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThrottleConfig {
    /// Cells resolved concurrently per batch.
    pub batch_size: usize,
    #[serde(rename = "batch_delay_ms", with = "duration_ms")]
    pub batch_delay: Duration,
    #[serde(rename = "column_delay_ms", with = "duration_ms")]
    pub column_delay: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            batch_delay: Duration::from_millis(200),
            column_delay: Duration::from_millis(500),
        }
    }
}

impl ThrottleConfig {
    /// No delays, for mocked or trusted endpoints.
    pub fn unthrottled(batch_size: usize) -> Self {
        Self {
            batch_size,
            batch_delay: Duration::ZERO,
            column_delay: Duration::ZERO,
        }
    }
}

/// Entity resolution tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EntitySearchConfig {
    pub max_entities_per_cell: usize,
    pub min_confidence: f64,
    pub language: String,
    /// Results requested from each knowledge base per search.
    pub search_limit: usize,
    /// Values shorter than this (in characters, after trimming) are skipped.
    pub min_value_length: usize,
    /// Entities below this confidence are enriched from the other knowledge base.
    pub cross_source_threshold: f64,
    /// Added when a label equals the query, ignoring case.
    pub exact_match_bonus: f64,
    /// Values never looked up.
    pub stop_values: Vec<String>,
    pub throttle: ThrottleConfig,
}

impl Default for EntitySearchConfig {
    fn default() -> Self {
        Self {
            max_entities_per_cell: 3,
            min_confidence: 0.3,
            language: "en".to_string(),
            search_limit: 10,
            min_value_length: 2,
            cross_source_threshold: 0.7,
            exact_match_bonus: 0.2,
            stop_values: vec!["0".to_string(), "-".to_string()],
            throttle: ThrottleConfig::default(),
        }
    }
}

impl EntitySearchConfig {
    pub fn validate(&self) -> SemtabResult<()> {
        check_nonzero("entity_search.max_entities_per_cell", self.max_entities_per_cell)?;
        check_nonzero("entity_search.search_limit", self.search_limit)?;
        check_nonzero("entity_search.throttle.batch_size", self.throttle.batch_size)?;
        check_unit("entity_search.min_confidence", self.min_confidence)?;
        check_unit("entity_search.cross_source_threshold", self.cross_source_threshold)?;
        check_unit("entity_search.exact_match_bonus", self.exact_match_bonus)?;
        if self.language.trim().is_empty() {
            return Err(invalid_config("entity_search.language", "", "must not be empty"));
        }
        Ok(())
    }
}

// ============================================================================
// ANALYSIS STAGES
// ============================================================================

/// Cross-base mapping boost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MappingEnhancerConfig {
    /// Multiplied by the mapping confidence for every matched equivalence.
    pub boost_per_mapping: f64,
    /// Upper bound on the total boost given to one candidate.
    pub max_total_boost: f64,
}

impl Default for MappingEnhancerConfig {
    fn default() -> Self {
        Self {
            boost_per_mapping: 0.1,
            max_total_boost: 0.3,
        }
    }
}

/// Column relationship inference thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelationAnalysisConfig {
    pub min_relation_confidence: f64,
    pub max_relations_per_column: usize,
}

impl Default for RelationAnalysisConfig {
    fn default() -> Self {
        Self {
            min_relation_confidence: 0.1,
            max_relations_per_column: 3,
        }
    }
}

/// URI pattern boost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UriAnalysisConfig {
    pub min_match_length: usize,
    pub confidence_boost: f64,
}

impl Default for UriAnalysisConfig {
    fn default() -> Self {
        Self {
            min_match_length: 3,
            confidence_boost: 0.1,
        }
    }
}

/// Type extraction and vocabulary normalisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TypeExtractionConfig {
    pub expand_parents: bool,
    /// Share of an entity's score credited to each immediate parent type.
    pub parent_weight: f64,
    pub min_type_confidence: f64,
    pub max_types_per_column: usize,
    /// Vocabulary the final column types are expressed in.
    pub target_vocabulary: KnowledgeBase,
    /// Relative boost for types already in the target vocabulary.
    pub normalization_boost: f64,
}

impl Default for TypeExtractionConfig {
    fn default() -> Self {
        Self {
            expand_parents: true,
            parent_weight: 0.7,
            min_type_confidence: 0.05,
            max_types_per_column: 5,
            target_vocabulary: KnowledgeBase::DbPedia,
            normalization_boost: 0.1,
        }
    }
}

/// Final aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AggregationConfig {
    pub relation_boost_factor: f64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            relation_boost_factor: 0.2,
        }
    }
}

// ============================================================================
// MASTER CONFIGURATION
// ============================================================================

/// Master configuration for an annotation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnnotatorConfig {
    /// Only the first `sample_size` rows of each column are resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_size: Option<usize>,
    /// Annotations below this confidence are omitted.
    pub confidence_threshold: f64,
    pub use_column_relations: bool,
    pub use_uri_analysis: bool,
    pub cache: CacheSettings,
    pub endpoints: EndpointConfig,
    pub retry: RetryConfig,
    pub entity_search: EntitySearchConfig,
    pub enhancer: MappingEnhancerConfig,
    pub relations: RelationAnalysisConfig,
    pub uri_analysis: UriAnalysisConfig,
    pub extraction: TypeExtractionConfig,
    pub aggregation: AggregationConfig,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            sample_size: None,
            confidence_threshold: 0.1,
            use_column_relations: true,
            use_uri_analysis: true,
            cache: CacheSettings::default(),
            endpoints: EndpointConfig::default(),
            retry: RetryConfig::default(),
            entity_search: EntitySearchConfig::default(),
            enhancer: MappingEnhancerConfig::default(),
            relations: RelationAnalysisConfig::default(),
            uri_analysis: UriAnalysisConfig::default(),
            extraction: TypeExtractionConfig::default(),
            aggregation: AggregationConfig::default(),
        }
    }
}

impl AnnotatorConfig {
    /// Parse a (possibly partial) TOML document and validate the result.
    pub fn from_toml_str(contents: &str) -> SemtabResult<Self> {
        let config: AnnotatorConfig = toml::from_str(contents).map_err(|e| {
            SemtabError::Config(ConfigError::Parse {
                reason: e.to_string(),
            })
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML configuration file.
    pub fn from_path(path: &Path) -> SemtabResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SemtabError::Config(ConfigError::Io {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
        })?;
        Self::from_toml_str(&contents)
    }

    /// Apply overrides to a copy of this configuration and validate it.
    pub fn merged(&self, overrides: &ConfigOverrides) -> SemtabResult<Self> {
        let mut merged = self.clone();
        overrides.apply_to(&mut merged);
        merged.validate()?;
        Ok(merged)
    }

    /// Validate the configuration.
    /// Returns Ok(()) if valid, Err(SemtabError::Config) if invalid.
    pub fn validate(&self) -> SemtabResult<()> {
        if let Some(sample_size) = self.sample_size {
            check_nonzero("sample_size", sample_size)?;
        }
        check_unit("confidence_threshold", self.confidence_threshold)?;

        self.cache.validate()?;
        self.endpoints.validate()?;
        self.retry.validate()?;
        self.entity_search.validate()?;

        check_unit("enhancer.boost_per_mapping", self.enhancer.boost_per_mapping)?;
        check_unit("enhancer.max_total_boost", self.enhancer.max_total_boost)?;

        check_unit(
            "relations.min_relation_confidence",
            self.relations.min_relation_confidence,
        )?;
        check_nonzero(
            "relations.max_relations_per_column",
            self.relations.max_relations_per_column,
        )?;

        check_nonzero("uri_analysis.min_match_length", self.uri_analysis.min_match_length)?;
        check_unit("uri_analysis.confidence_boost", self.uri_analysis.confidence_boost)?;

        check_unit("extraction.parent_weight", self.extraction.parent_weight)?;
        check_unit("extraction.min_type_confidence", self.extraction.min_type_confidence)?;
        check_nonzero(
            "extraction.max_types_per_column",
            self.extraction.max_types_per_column,
        )?;
        check_unit("extraction.normalization_boost", self.extraction.normalization_boost)?;

        check_unit(
            "aggregation.relation_boost_factor",
            self.aggregation.relation_boost_factor,
        )?;

        Ok(())
    }
}

// ============================================================================
// OVERRIDES
// ============================================================================

/// Flat set of optional overrides for the commonly tuned options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
    pub sample_size: Option<usize>,
    pub confidence_threshold: Option<f64>,
    pub use_column_relations: Option<bool>,
    pub use_uri_analysis: Option<bool>,
    pub wikidata_cache_size: Option<usize>,
    pub dbpedia_cache_size: Option<usize>,
    pub wikidata_cache_max_age_ms: Option<u64>,
    pub dbpedia_cache_max_age_ms: Option<u64>,
    pub wikidata_api: Option<String>,
    pub wikidata_sparql: Option<String>,
    pub dbpedia_lookup: Option<String>,
    pub dbpedia_sparql: Option<String>,
    pub max_entities_per_cell: Option<usize>,
    pub min_confidence: Option<f64>,
    pub language: Option<String>,
    pub batch_size: Option<usize>,
    pub batch_delay_ms: Option<u64>,
    pub column_delay_ms: Option<u64>,
    pub min_value_length: Option<usize>,
    pub cross_source_threshold: Option<f64>,
    pub max_retries: Option<u32>,
    pub min_relation_confidence: Option<f64>,
    pub max_relations_per_column: Option<usize>,
    pub min_type_confidence: Option<f64>,
    pub max_types_per_column: Option<usize>,
    pub relation_boost_factor: Option<f64>,
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

impl ConfigOverrides {
    /// Read overrides from `SEMTAB_*` environment variables.
    ///
    /// Unset or unparsable variables leave the option untouched.
    pub fn from_env() -> Self {
        Self {
            sample_size: env_parse("SEMTAB_SAMPLE_SIZE"),
            confidence_threshold: env_parse("SEMTAB_CONFIDENCE_THRESHOLD"),
            use_column_relations: env_parse("SEMTAB_USE_COLUMN_RELATIONS"),
            use_uri_analysis: env_parse("SEMTAB_USE_URI_ANALYSIS"),
            wikidata_cache_size: env_parse("SEMTAB_WIKIDATA_CACHE_SIZE"),
            dbpedia_cache_size: env_parse("SEMTAB_DBPEDIA_CACHE_SIZE"),
            wikidata_cache_max_age_ms: env_parse("SEMTAB_WIKIDATA_CACHE_MAX_AGE_MS"),
            dbpedia_cache_max_age_ms: env_parse("SEMTAB_DBPEDIA_CACHE_MAX_AGE_MS"),
            wikidata_api: env_parse("SEMTAB_WIKIDATA_API"),
            wikidata_sparql: env_parse("SEMTAB_WIKIDATA_SPARQL"),
            dbpedia_lookup: env_parse("SEMTAB_DBPEDIA_LOOKUP"),
            dbpedia_sparql: env_parse("SEMTAB_DBPEDIA_SPARQL"),
            max_entities_per_cell: env_parse("SEMTAB_MAX_ENTITIES_PER_CELL"),
            min_confidence: env_parse("SEMTAB_MIN_CONFIDENCE"),
            language: env_parse("SEMTAB_LANGUAGE"),
            batch_size: env_parse("SEMTAB_BATCH_SIZE"),
            batch_delay_ms: env_parse("SEMTAB_BATCH_DELAY_MS"),
            column_delay_ms: env_parse("SEMTAB_COLUMN_DELAY_MS"),
            min_value_length: env_parse("SEMTAB_MIN_VALUE_LENGTH"),
            cross_source_threshold: env_parse("SEMTAB_CROSS_SOURCE_THRESHOLD"),
            max_retries: env_parse("SEMTAB_MAX_RETRIES"),
            min_relation_confidence: env_parse("SEMTAB_MIN_RELATION_CONFIDENCE"),
            max_relations_per_column: env_parse("SEMTAB_MAX_RELATIONS_PER_COLUMN"),
            min_type_confidence: env_parse("SEMTAB_MIN_TYPE_CONFIDENCE"),
            max_types_per_column: env_parse("SEMTAB_MAX_TYPES_PER_COLUMN"),
            relation_boost_factor: env_parse("SEMTAB_RELATION_BOOST_FACTOR"),
        }
    }

    fn apply_to(&self, config: &mut AnnotatorConfig) {
        if let Some(v) = self.sample_size {
            config.sample_size = Some(v);
        }
        if let Some(v) = self.confidence_threshold {
            config.confidence_threshold = v;
        }
        if let Some(v) = self.use_column_relations {
            config.use_column_relations = v;
        }
        if let Some(v) = self.use_uri_analysis {
            config.use_uri_analysis = v;
        }
        if let Some(v) = self.wikidata_cache_size {
            config.cache.wikidata.max_entries = v;
        }
        if let Some(v) = self.dbpedia_cache_size {
            config.cache.dbpedia.max_entries = v;
        }
        if let Some(v) = self.wikidata_cache_max_age_ms {
            config.cache.wikidata.max_age = Some(Duration::from_millis(v));
        }
        if let Some(v) = self.dbpedia_cache_max_age_ms {
            config.cache.dbpedia.max_age = Some(Duration::from_millis(v));
        }
        if let Some(v) = &self.wikidata_api {
            config.endpoints.wikidata_api = v.clone();
        }
        if let Some(v) = &self.wikidata_sparql {
            config.endpoints.wikidata_sparql = v.clone();
        }
        if let Some(v) = &self.dbpedia_lookup {
            config.endpoints.dbpedia_lookup = v.clone();
        }
        if let Some(v) = &self.dbpedia_sparql {
            config.endpoints.dbpedia_sparql = v.clone();
        }
        if let Some(v) = self.max_entities_per_cell {
            config.entity_search.max_entities_per_cell = v;
        }
        if let Some(v) = self.min_confidence {
            config.entity_search.min_confidence = v;
        }
        if let Some(v) = &self.language {
            config.entity_search.language = v.clone();
        }
        if let Some(v) = self.batch_size {
            config.entity_search.throttle.batch_size = v;
        }
        if let Some(v) = self.batch_delay_ms {
            config.entity_search.throttle.batch_delay = Duration::from_millis(v);
        }
        if let Some(v) = self.column_delay_ms {
            config.entity_search.throttle.column_delay = Duration::from_millis(v);
        }
        if let Some(v) = self.min_value_length {
            config.entity_search.min_value_length = v;
        }
        if let Some(v) = self.cross_source_threshold {
            config.entity_search.cross_source_threshold = v;
        }
        if let Some(v) = self.max_retries {
            config.retry.max_retries = v;
        }
        if let Some(v) = self.min_relation_confidence {
            config.relations.min_relation_confidence = v;
        }
        if let Some(v) = self.max_relations_per_column {
            config.relations.max_relations_per_column = v;
        }
        if let Some(v) = self.min_type_confidence {
            config.extraction.min_type_confidence = v;
        }
        if let Some(v) = self.max_types_per_column {
            config.extraction.max_types_per_column = v;
        }
        if let Some(v) = self.relation_boost_factor {
            config.aggregation.relation_boost_factor = v;
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invalid_field(result: SemtabResult<AnnotatorConfig>, expected_field: &str) {
        match result {
            Err(SemtabError::Config(ConfigError::InvalidValue { field, .. })) => {
                assert_eq!(field, expected_field)
            }
            other => panic!("expected invalid {}, got {:?}", expected_field, other),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(AnnotatorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AnnotatorConfig::from_toml_str(
            r#"
            confidence_threshold = 0.25

            [entity_search]
            max_entities_per_cell = 5

            [entity_search.throttle]
            batch_delay_ms = 0

            [cache.dbpedia]
            max_entries = 50
            "#,
        )
        .unwrap();

        assert_eq!(config.confidence_threshold, 0.25);
        assert_eq!(config.entity_search.max_entities_per_cell, 5);
        assert_eq!(config.entity_search.min_confidence, 0.3);
        assert_eq!(config.entity_search.throttle.batch_delay, Duration::ZERO);
        assert_eq!(config.entity_search.throttle.batch_size, 5);
        assert_eq!(config.cache.dbpedia.max_entries, 50);
        assert_eq!(config.cache.wikidata.max_entries, 10_000);
    }

    #[test]
    fn test_toml_rejects_unknown_keys() {
        let result = AnnotatorConfig::from_toml_str("use_magic = true");
        assert!(matches!(
            result,
            Err(SemtabError::Config(ConfigError::Parse { .. }))
        ));
    }

    #[test]
    fn test_toml_target_vocabulary() {
        let config = AnnotatorConfig::from_toml_str(
            r#"
            [extraction]
            target_vocabulary = "wikidata"
            "#,
        )
        .unwrap();
        assert_eq!(config.extraction.target_vocabulary, KnowledgeBase::Wikidata);
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        let base = AnnotatorConfig::default();

        let overrides = ConfigOverrides {
            min_confidence: Some(1.5),
            ..Default::default()
        };
        assert_invalid_field(base.merged(&overrides), "entity_search.min_confidence");

        let overrides = ConfigOverrides {
            batch_size: Some(0),
            ..Default::default()
        };
        assert_invalid_field(base.merged(&overrides), "entity_search.throttle.batch_size");

        let overrides = ConfigOverrides {
            dbpedia_cache_size: Some(0),
            ..Default::default()
        };
        assert_invalid_field(base.merged(&overrides), "cache.dbpedia.max_entries");

        let overrides = ConfigOverrides {
            wikidata_sparql: Some("ftp://example.org".to_string()),
            ..Default::default()
        };
        assert_invalid_field(base.merged(&overrides), "endpoints.wikidata_sparql");
    }

    #[test]
    fn test_merge_is_pure() {
        let base = AnnotatorConfig::default();
        let overrides = ConfigOverrides {
            sample_size: Some(20),
            use_uri_analysis: Some(false),
            batch_delay_ms: Some(0),
            max_retries: Some(1),
            ..Default::default()
        };

        let merged = base.merged(&overrides).unwrap();
        assert_eq!(merged.sample_size, Some(20));
        assert!(!merged.use_uri_analysis);
        assert_eq!(merged.entity_search.throttle.batch_delay, Duration::ZERO);
        assert_eq!(merged.retry.max_retries, 1);

        assert_eq!(base, AnnotatorConfig::default());
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let retry = RetryConfig {
            max_retries: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(500),
            backoff_multiplier: 2.0,
            request_timeout: Duration::from_secs(1),
        };
        assert_eq!(retry.backoff_for(0), Duration::from_millis(100));
        assert_eq!(retry.backoff_for(1), Duration::from_millis(200));
        assert_eq!(retry.backoff_for(2), Duration::from_millis(400));
        assert_eq!(retry.backoff_for(3), Duration::from_millis(500));
        assert_eq!(retry.backoff_for(40), Duration::from_millis(500));
    }

    #[test]
    fn test_retry_validation() {
        let retry = RetryConfig {
            backoff_multiplier: 0.5,
            ..Default::default()
        };
        assert!(retry.validate().is_err());

        let retry = RetryConfig {
            initial_backoff: Duration::from_secs(5),
            max_backoff: Duration::from_secs(1),
            ..Default::default()
        };
        assert!(retry.validate().is_err());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = AnnotatorConfig::default();
        let toml = toml::to_string(&config).unwrap();
        let parsed = AnnotatorConfig::from_toml_str(&toml).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_from_path_reports_unreadable_file() {
        let path = std::env::temp_dir().join("semtab-missing-dir/annotator.toml");
        match AnnotatorConfig::from_path(&path) {
            Err(SemtabError::Config(ConfigError::Io { path: reported, .. })) => {
                assert_eq!(reported, path.display().to_string())
            }
            other => panic!("expected Io error, got {:?}", other),
        }
    }

    #[test]
    fn test_from_path_reads_partial_file() {
        let path = std::env::temp_dir().join(format!("semtab-config-{}.toml", std::process::id()));
        std::fs::write(&path, "sample_size = 12\n").unwrap();
        let config = AnnotatorConfig::from_path(&path);
        std::fs::remove_file(&path).unwrap();

        let config = config.unwrap();
        assert_eq!(config.sample_size, Some(12));
        assert_eq!(config.retry, RetryConfig::default());
    }

    // The only test in this crate that touches SEMTAB_* variables.
    #[test]
    fn test_overrides_from_env() {
        std::env::set_var("SEMTAB_SAMPLE_SIZE", " 7 ");
        std::env::set_var("SEMTAB_MAX_RETRIES", "abc");
        std::env::remove_var("SEMTAB_LANGUAGE");

        let overrides = ConfigOverrides::from_env();

        std::env::remove_var("SEMTAB_SAMPLE_SIZE");
        std::env::remove_var("SEMTAB_MAX_RETRIES");

        assert_eq!(overrides.sample_size, Some(7));
        assert_eq!(overrides.max_retries, None);
        assert_eq!(overrides.language, None);

        let merged = AnnotatorConfig::default().merged(&overrides).unwrap();
        assert_eq!(merged.sample_size, Some(7));
        assert_eq!(merged.retry.max_retries, RetryConfig::default().max_retries);
    }
}
