//! SPARQL query helpers and the JSON results format.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;

/// Media type of SPARQL JSON results.
pub const SPARQL_JSON: &str = "application/sparql-results+json";

static IRI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^https?://[^\s<>"{}|\\^`]+$"#).expect("Invalid IRI regex"));

/// Wrap a URI as a SPARQL IRI reference, or `None` if it cannot be embedded
/// safely.
pub fn iri(uri: &str) -> Option<String> {
    let uri = uri.trim();
    IRI.is_match(uri).then(|| format!("<{}>", uri))
}

/// Escape a string for use inside a double-quoted SPARQL literal.
pub fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

/// `SELECT` results in the W3C JSON format.
#[derive(Debug, Clone, Deserialize)]
pub struct SparqlResponse {
    pub results: SparqlResults,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SparqlResults {
    #[serde(default)]
    pub bindings: Vec<HashMap<String, SparqlValue>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SparqlValue {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl SparqlResponse {
    /// Values bound to `var` that are URIs, in result order, without repeats.
    pub fn uris(&self, var: &str) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.results
            .bindings
            .iter()
            .filter_map(|row| row.get(var))
            .filter(|v| v.kind == "uri")
            .filter(|v| seen.insert(v.value.clone()))
            .map(|v| v.value.clone())
            .collect()
    }

    /// `(uri, label)` pairs for a URI variable and its optional label
    /// variable, without repeated URIs.
    pub fn labelled_uris(&self, var: &str, label_var: &str) -> Vec<(String, Option<String>)> {
        let mut seen = std::collections::HashSet::new();
        self.results
            .bindings
            .iter()
            .filter_map(|row| {
                let uri = row.get(var).filter(|v| v.kind == "uri")?;
                let label = row.get(label_var).map(|v| v.value.clone());
                Some((uri.value.clone(), label))
            })
            .filter(|(uri, _)| seen.insert(uri.clone()))
            .collect()
    }
}
