//! Wikidata provider implementation
//!
//! Entity search through the `wbsearchentities` action API, and type
//! lookups (`P31` instance-of, `P279` subclass-of) through the SPARQL
//! query service.

pub mod client;
pub mod types;

pub use client::WikidataClient;
