//! DBpedia Lookup response types

use crate::providers::rank_confidence;
use once_cell::sync::Lazy;
use regex::Regex;
use semtab_core::{label_from_uri, Entity, KnowledgeBase};
use serde::Deserialize;

/// Namespace of DBpedia ontology classes.
pub const ONTOLOGY_PREFIX: &str = "http://dbpedia.org/ontology/";

/// Highlight markup the Lookup service puts around matched text.
static MARKUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?[A-Za-z]+>").expect("Invalid markup regex"));

/// Body of a Lookup `search` response. Every field is a list, usually of
/// one element.
#[derive(Debug, Clone, Deserialize)]
pub struct LookupResponse {
    #[serde(default)]
    pub docs: Vec<LookupDoc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LookupDoc {
    #[serde(default)]
    pub resource: Vec<String>,
    #[serde(default)]
    pub label: Vec<String>,
    #[serde(default)]
    pub comment: Vec<String>,
    #[serde(default)]
    pub score: Vec<String>,
}

impl LookupDoc {
    fn score(&self) -> Option<f64> {
        self.score
            .first()
            .and_then(|s| s.trim().parse::<f64>().ok())
            .filter(|s| s.is_finite() && *s >= 0.0)
    }
}

fn strip_markup(text: &str) -> String {
    MARKUP.replace_all(text, "").trim().to_string()
}

impl LookupResponse {
    /// Convert documents to entities, best first, keeping at most `limit`.
    ///
    /// Lookup scores are unbounded, so they are scaled against the best
    /// score in the response. Without scores confidence decays with rank.
    pub fn into_entities(self, limit: usize) -> Vec<Entity> {
        let best = self
            .docs
            .iter()
            .filter_map(LookupDoc::score)
            .fold(0.0_f64, f64::max);

        self.docs
            .into_iter()
            .filter(|doc| !doc.resource.is_empty())
            .take(limit)
            .enumerate()
            .map(|(rank, doc)| {
                let confidence = match doc.score() {
                    Some(score) if best > 0.0 => 0.9 * score / best,
                    _ => rank_confidence(rank),
                };
                let uri = doc.resource[0].clone();
                let label = doc
                    .label
                    .first()
                    .map(|l| strip_markup(l))
                    .filter(|l| !l.is_empty())
                    .unwrap_or_else(|| label_from_uri(&uri));
                let entity = Entity::new(uri, label, KnowledgeBase::DbPedia, confidence);
                match doc.comment.first() {
                    Some(comment) => entity.with_description(strip_markup(comment)),
                    None => entity,
                }
            })
            .collect()
    }
}
