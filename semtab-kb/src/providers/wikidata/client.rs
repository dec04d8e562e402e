//! Wikidata client

use super::types::SearchResponse;
use crate::providers::http::HttpCore;
use crate::providers::invalid_response;
use crate::providers::sparql::{escape_literal, iri, SparqlResponse, SPARQL_JSON};
use crate::{KbResult, KnowledgeBaseClient};
use async_trait::async_trait;
use semtab_core::{label_from_uri, EndpointConfig, Entity, KnowledgeBase, SemanticType};

/// Largest page `wbsearchentities` serves to anonymous clients.
const MAX_SEARCH_LIMIT: usize = 50;

const INSTANCE_OF: &str = "<http://www.wikidata.org/prop/direct/P31>";
const SUBCLASS_OF: &str = "<http://www.wikidata.org/prop/direct/P279>";

/// Wikidata knowledge-base client.
pub struct WikidataClient {
    http: HttpCore,
    api_url: String,
    sparql_url: String,
    default_language: String,
}

impl WikidataClient {
    /// Create a client against the configured endpoints.
    ///
    /// # Arguments
    /// * `endpoints` - Endpoint URLs, user agent and request budget
    /// * `default_language` - Label language when a call does not name one
    pub fn new(endpoints: &EndpointConfig, default_language: impl Into<String>) -> KbResult<Self> {
        Ok(Self {
            http: HttpCore::new(KnowledgeBase::Wikidata, endpoints)?,
            api_url: endpoints.wikidata_api.clone(),
            sparql_url: endpoints.wikidata_sparql.clone(),
            default_language: default_language.into(),
        })
    }

    async fn select(&self, query: &str) -> KbResult<SparqlResponse> {
        self.http
            .get_json(
                &self.sparql_url,
                &[("query", query), ("format", "json")],
                SPARQL_JSON,
            )
            .await
    }
}

pub(crate) fn types_query(subject: &str, language: &str) -> String {
    format!(
        "SELECT ?type ?typeLabel WHERE {{ {} {} ?type . \
         SERVICE wikibase:label {{ bd:serviceParam wikibase:language \"{},en\" . }} }}",
        subject,
        INSTANCE_OF,
        escape_literal(language)
    )
}

pub(crate) fn parents_query(subject: &str) -> String {
    format!("SELECT ?parent WHERE {{ {} {} ?parent . }}", subject, SUBCLASS_OF)
}

#[async_trait]
impl KnowledgeBaseClient for WikidataClient {
    fn source(&self) -> KnowledgeBase {
        KnowledgeBase::Wikidata
    }

    async fn search_entities(
        &self,
        query: &str,
        language: Option<&str>,
        limit: usize,
    ) -> KbResult<Vec<Entity>> {
        let language = language.unwrap_or(&self.default_language);
        let limit = limit.clamp(1, MAX_SEARCH_LIMIT);
        let limit_param = limit.to_string();

        let response: SearchResponse = self
            .http
            .get_json(
                &self.api_url,
                &[
                    ("action", "wbsearchentities"),
                    ("search", query),
                    ("language", language),
                    ("uselang", language),
                    ("type", "item"),
                    ("limit", &limit_param),
                    ("format", "json"),
                ],
                "application/json",
            )
            .await?;

        response
            .into_entities(limit)
            .map_err(|reason| invalid_response(KnowledgeBase::Wikidata, reason))
    }

    async fn entity_types(&self, entity_uri: &str) -> KbResult<Vec<SemanticType>> {
        let Some(subject) = iri(entity_uri) else {
            tracing::debug!(entity_uri, "not a Wikidata IRI, no types");
            return Ok(Vec::new());
        };

        let response = self
            .select(&types_query(&subject, &self.default_language))
            .await?;
        Ok(response
            .labelled_uris("type", "typeLabel")
            .into_iter()
            .map(|(uri, label)| {
                let label = label.unwrap_or_else(|| label_from_uri(&uri));
                SemanticType::new(uri, label, KnowledgeBase::Wikidata)
            })
            .collect())
    }

    async fn parent_types(&self, type_uri: &str) -> KbResult<Vec<String>> {
        let Some(subject) = iri(type_uri) else {
            return Ok(Vec::new());
        };
        Ok(self.select(&parents_query(&subject)).await?.uris("parent"))
    }
}

impl std::fmt::Debug for WikidataClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WikidataClient")
            .field("api_url", &self.api_url)
            .field("sparql_url", &self.sparql_url)
            .field("default_language", &self.default_language)
            .finish()
    }
}
