//! SemTab Annotate - Column Type and Cell Entity Annotation
//!
//! Links table cells to Wikidata and DBpedia entities and votes a semantic
//! type for every column. Stages run in this order:
//!
//! 1. [`EntityResolver`] searches both knowledge bases per cell.
//! 2. [`MappingEnhancer`] rewards candidates whose types agree across bases.
//! 3. [`ColumnRelationshipAnalyzer`] infers relations between columns.
//! 4. [`UriPatternAnalyzer`] rewards URIs that mention neighbouring cells.
//! 5. [`TypeExtractor`] votes column types and normalises their vocabulary.
//! 6. [`TypeAggregator`] picks the final type, using relations to break ties.
//!
//! [`Annotator`] runs the whole pipeline over a [`semtab_core::Table`].

pub mod aggregation;
pub mod column_relations;
pub mod enhancer;
pub mod extraction;
pub mod mapping;
pub mod pipeline;
pub mod relationships;
pub mod resolution;
pub mod uri_patterns;

pub use aggregation::TypeAggregator;
pub use column_relations::{type_distribution, ColumnRelationshipAnalyzer};
pub use enhancer::MappingEnhancer;
pub use extraction::{is_too_general, TypeExtractor};
pub use mapping::{Equivalent, TypeMappingTable};
pub use pipeline::{AnnotationReport, Annotator, CacheReport};
pub use relationships::TypeRelationshipTable;
pub use resolution::EntityResolver;
pub use uri_patterns::{normalize_fragment, UriPatternAnalyzer};
