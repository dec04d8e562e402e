//! DBpedia provider implementation
//!
//! Entity search through the DBpedia Lookup service, and type lookups
//! (`rdf:type`, `rdfs:subClassOf`) restricted to the DBpedia ontology
//! through the public SPARQL endpoint.

pub mod client;
pub mod types;

pub use client::DbpediaClient;
