//! Wikidata API request and response types

use crate::providers::rank_confidence;
use semtab_core::{Entity, KnowledgeBase};
use serde::Deserialize;

/// Prefix of Wikidata entity URIs.
pub const ENTITY_PREFIX: &str = "http://www.wikidata.org/entity/";

// ============================================================================
// ENTITY SEARCH
// ============================================================================

/// Body of a `wbsearchentities` response.
///
/// The action API reports failures with HTTP 200 and an `error` object.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub search: Vec<SearchHit>,
    #[serde(default)]
    pub error: Option<ApiError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    pub id: String,
    #[serde(default)]
    pub concepturi: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "match")]
    pub matched: Option<SearchMatch>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchMatch {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    pub code: String,
    #[serde(default)]
    pub info: String,
}

impl SearchResponse {
    /// Convert hits to entities, best first, keeping at most `limit`.
    ///
    /// The service returns no score, so confidence decays with rank.
    pub fn into_entities(self, limit: usize) -> Result<Vec<Entity>, String> {
        if let Some(error) = self.error {
            return Err(format!("{}: {}", error.code, error.info));
        }

        Ok(self
            .search
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(rank, hit)| {
                let uri = hit
                    .concepturi
                    .unwrap_or_else(|| format!("{}{}", ENTITY_PREFIX, hit.id));
                let label = hit
                    .label
                    .or_else(|| hit.matched.map(|m| m.text))
                    .unwrap_or_else(|| hit.id.clone());
                let confidence = rank_confidence(rank);
                let entity = Entity::new(uri, label, KnowledgeBase::Wikidata, confidence);
                match hit.description {
                    Some(description) => entity.with_description(description),
                    None => entity,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_response_to_entities() {
        let body = r#"{
            "searchinfo": {"search": "Paris"},
            "search": [
                {"id": "Q90", "concepturi": "http://www.wikidata.org/entity/Q90",
                 "label": "Paris", "description": "capital of France",
                 "match": {"type": "label", "language": "en", "text": "Paris"}},
                {"id": "Q167646",
                 "match": {"type": "alias", "language": "en", "text": "Paris, Texas"}}
            ],
            "success": 1
        }"#;
        let response: SearchResponse = serde_json::from_str(body).unwrap();
        let entities = response.into_entities(10).unwrap();

        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].uri, "http://www.wikidata.org/entity/Q90");
        assert_eq!(entities[0].description.as_deref(), Some("capital of France"));
        assert!(entities[0].confidence > entities[1].confidence);
        assert_eq!(entities[1].uri, "http://www.wikidata.org/entity/Q167646");
        assert_eq!(entities[1].label, "Paris, Texas");
    }

    #[test]
    fn test_search_response_limit() {
        let body = r#"{"search": [{"id": "Q1"}, {"id": "Q2"}, {"id": "Q3"}]}"#;
        let response: SearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.into_entities(2).unwrap().len(), 2);
    }

    #[test]
    fn test_search_response_api_error() {
        let body = r#"{"error": {
            "code": "badvalue",
            "info": "Unrecognized value for parameter \"language\""
        }}"#;
        let response: SearchResponse = serde_json::from_str(body).unwrap();
        let err = response.into_entities(10).unwrap_err();
        assert!(err.starts_with("badvalue"));
    }
}
