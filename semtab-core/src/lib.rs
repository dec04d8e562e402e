//! SemTab Core - Data Model
//!
//! Pure data structures shared by every other crate: cells, knowledge-base
//! entities, semantic types, the intermediate candidates produced by the
//! annotation pipeline and its final annotations. Behaviour is limited to
//! constructors, score clamping and URI helpers.

use serde::{Deserialize, Serialize};

pub mod config;
pub mod error;

pub use config::{
    AggregationConfig, AnnotatorConfig, CacheLimits, CacheSettings, ConfigOverrides,
    EndpointConfig, EntitySearchConfig, MappingEnhancerConfig, RelationAnalysisConfig,
    RetryConfig, ThrottleConfig, TypeExtractionConfig, UriAnalysisConfig,
};
pub use error::{
    ConfigError, KnowledgeBaseError, SemtabError, SemtabResult, ValidationError,
};

// ============================================================================
// KNOWLEDGE BASES
// ============================================================================

/// The two knowledge bases the annotator draws evidence from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeBase {
    Wikidata,
    #[serde(rename = "dbpedia")]
    DbPedia,
}

impl KnowledgeBase {
    /// Both knowledge bases, in a fixed order.
    pub const ALL: [KnowledgeBase; 2] = [KnowledgeBase::Wikidata, KnowledgeBase::DbPedia];

    /// The knowledge base that is not `self`.
    pub fn other(self) -> Self {
        match self {
            Self::Wikidata => Self::DbPedia,
            Self::DbPedia => Self::Wikidata,
        }
    }

    /// Stable lowercase identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wikidata => "wikidata",
            Self::DbPedia => "dbpedia",
        }
    }

    /// Parse from the identifier produced by [`KnowledgeBase::as_str`].
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wikidata" => Some(Self::Wikidata),
            "dbpedia" => Some(Self::DbPedia),
            _ => None,
        }
    }
}

impl std::fmt::Display for KnowledgeBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SCORE AND URI HELPERS
// ============================================================================

/// Clamp a score into `[0, 1]`. NaN collapses to 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Last path segment (or fragment) of a URI.
///
/// `http://dbpedia.org/ontology/City` -> `City`,
/// `http://www.w3.org/2002/07/owl#Thing` -> `Thing`.
pub fn local_name(uri: &str) -> &str {
    let trimmed = uri.trim_end_matches(['/', '#']);
    match trimmed.rfind(['/', '#']) {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

/// Human-readable label derived from a URI's local name.
pub fn label_from_uri(uri: &str) -> String {
    local_name(uri).replace('_', " ")
}

// ============================================================================
// INPUT MODEL
// ============================================================================

/// A single table cell. Identity is `(row_index, column_index)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub value: String,
    pub row_index: usize,
    pub column_index: usize,
}

impl Cell {
    pub fn new(value: impl Into<String>, row_index: usize, column_index: usize) -> Self {
        Self {
            value: value.into(),
            row_index,
            column_index,
        }
    }

    /// `(row, column)` identity of the cell.
    pub fn position(&self) -> (usize, usize) {
        (self.row_index, self.column_index)
    }
}

/// Column-major view of a cleaned table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub headers: Vec<String>,
    /// `columns[c][r]` is the cell at row `r` of column `c`.
    pub columns: Vec<Vec<Cell>>,
}

impl Table {
    /// Build a table from row-major string values.
    ///
    /// Rejects tables without columns or rows, and rows whose width differs
    /// from the header.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<String>>) -> SemtabResult<Self> {
        if headers.is_empty() {
            return Err(ValidationError::EmptyInput {
                what: "table headers".to_string(),
            }
            .into());
        }
        if rows.is_empty() {
            return Err(ValidationError::EmptyInput {
                what: "table rows".to_string(),
            }
            .into());
        }

        let mut columns: Vec<Vec<Cell>> = vec![Vec::with_capacity(rows.len()); headers.len()];
        for (row_index, row) in rows.into_iter().enumerate() {
            if row.len() != headers.len() {
                return Err(ValidationError::RaggedRow {
                    row: row_index,
                    expected: headers.len(),
                    got: row.len(),
                }
                .into());
            }
            for (column_index, value) in row.into_iter().enumerate() {
                columns[column_index].push(Cell::new(value, row_index, column_index));
            }
        }

        Ok(Self { headers, columns })
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(Vec::len).unwrap_or(0)
    }

    /// Header of a column, or an empty string for out-of-range indices.
    pub fn header(&self, column_index: usize) -> &str {
        self.headers
            .get(column_index)
            .map(String::as_str)
            .unwrap_or("")
    }
}

// ============================================================================
// KNOWLEDGE-BASE RESOURCES
// ============================================================================

/// A knowledge-base resource matched to a cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub uri: String,
    pub label: String,
    pub description: Option<String>,
    pub source: KnowledgeBase,
    /// Match confidence (0.0 to 1.0)
    pub confidence: f64,
}

impl Entity {
    pub fn new(
        uri: impl Into<String>,
        label: impl Into<String>,
        source: KnowledgeBase,
        confidence: f64,
    ) -> Self {
        Self {
            uri: uri.into(),
            label: label.into(),
            description: None,
            source,
            confidence: clamp_unit(confidence),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A class or category describing what kind of thing an entity is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticType {
    pub uri: String,
    pub label: String,
    pub source: KnowledgeBase,
    /// Immediate parent type URIs; `None` until fetched.
    pub parent_types: Option<Vec<String>>,
}

impl SemanticType {
    pub fn new(uri: impl Into<String>, label: impl Into<String>, source: KnowledgeBase) -> Self {
        Self {
            uri: uri.into(),
            label: label.into(),
            source,
            parent_types: None,
        }
    }

    /// Build a type whose label is derived from its URI.
    pub fn from_uri(uri: impl Into<String>, source: KnowledgeBase) -> Self {
        let uri = uri.into();
        let label = label_from_uri(&uri);
        Self::new(uri, label, source)
    }
}

/// One hypothesis linking a cell to an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityCandidate {
    pub cell: Cell,
    pub entity: Entity,
    pub types: Vec<SemanticType>,
    /// Starts at `entity.confidence`; only ever raised, never above 1.0.
    pub score: f64,
}

impl EntityCandidate {
    pub fn new(cell: Cell, entity: Entity, types: Vec<SemanticType>) -> Self {
        let score = clamp_unit(entity.confidence);
        Self {
            cell,
            entity,
            types,
            score,
        }
    }

    /// Raise the score by `amount`, capped at 1.0. Returns the increase applied.
    pub fn boost(&mut self, amount: f64) -> f64 {
        if !(amount > 0.0) {
            return 0.0;
        }
        let before = self.score;
        self.score = clamp_unit(self.score + amount);
        self.score - before
    }

    /// Exact URI equality against the carried types.
    pub fn has_type(&self, type_uri: &str) -> bool {
        self.types.iter().any(|t| t.uri == type_uri)
    }

    /// Same hypothesis attached to a different cell.
    pub fn rebind(&self, cell: &Cell) -> Self {
        Self {
            cell: cell.clone(),
            ..self.clone()
        }
    }
}

// ============================================================================
// STATIC TABLE ENTRIES
// ============================================================================

/// Equivalence between one Wikidata class and one DBpedia class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeMapping {
    pub wikidata_type: String,
    pub dbpedia_type: String,
    pub confidence: f64,
    pub description: Option<String>,
}

impl TypeMapping {
    pub fn new(
        wikidata_type: impl Into<String>,
        dbpedia_type: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            wikidata_type: wikidata_type.into(),
            dbpedia_type: dbpedia_type.into(),
            confidence: clamp_unit(confidence),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The side of the mapping that belongs to `kb`.
    pub fn type_for(&self, kb: KnowledgeBase) -> &str {
        match kb {
            KnowledgeBase::Wikidata => &self.wikidata_type,
            KnowledgeBase::DbPedia => &self.dbpedia_type,
        }
    }
}

/// Directed, named semantic relation between two types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeRelationship {
    pub source_type: String,
    pub target_type: String,
    pub relation_name: String,
    pub confidence: f64,
}

impl TypeRelationship {
    pub fn new(
        source_type: impl Into<String>,
        target_type: impl Into<String>,
        relation_name: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            source_type: source_type.into(),
            target_type: target_type.into(),
            relation_name: relation_name.into(),
            confidence: clamp_unit(confidence),
        }
    }
}

// ============================================================================
// ANALYSIS RESULTS
// ============================================================================

/// Relation inferred between two columns of one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRelation {
    pub source_column: usize,
    pub target_column: usize,
    pub relation_type: Option<String>,
    pub confidence: f64,
}

impl ColumnRelation {
    /// Whether the relation has `column` at either end.
    pub fn touches(&self, column: usize) -> bool {
        self.source_column == column || self.target_column == column
    }
}

/// A type aggregated across the entities of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeCandidate {
    pub semantic_type: SemanticType,
    /// Sum of contributing entity scores.
    pub score: f64,
    pub entity_matches: usize,
    /// `score / total candidates in column`, clamped to `[0, 1]`.
    pub confidence: f64,
}

/// Final column type annotation (CTA).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnTypeAnnotation {
    pub column_index: usize,
    pub column_header: String,
    pub assigned_type: SemanticType,
    pub confidence: f64,
    /// Remaining candidates in ranked order.
    pub alternative_types: Vec<TypeCandidate>,
}

/// Final cell entity annotation (CEA).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellEntityAnnotation {
    pub row: usize,
    pub column: usize,
    pub uri: String,
    pub confidence: f64,
}

// ============================================================================
// TESTS
// ============================================================================


// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
