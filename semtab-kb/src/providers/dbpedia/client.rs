//! DBpedia client

use super::types::{LookupResponse, ONTOLOGY_PREFIX};
use crate::providers::http::HttpCore;
use crate::providers::sparql::{iri, SparqlResponse, SPARQL_JSON};
use crate::{KbResult, KnowledgeBaseClient};
use async_trait::async_trait;
use semtab_core::{EndpointConfig, Entity, KnowledgeBase, SemanticType};

const RDF_TYPE: &str = "<http://www.w3.org/1999/02/22-rdf-syntax-ns#type>";
const SUBCLASS_OF: &str = "<http://www.w3.org/2000/01/rdf-schema#subClassOf>";

/// DBpedia knowledge-base client.
pub struct DbpediaClient {
    http: HttpCore,
    lookup_url: String,
    sparql_url: String,
}

impl DbpediaClient {
    pub fn new(endpoints: &EndpointConfig) -> KbResult<Self> {
        Ok(Self {
            http: HttpCore::new(KnowledgeBase::DbPedia, endpoints)?,
            lookup_url: endpoints.dbpedia_lookup.clone(),
            sparql_url: endpoints.dbpedia_sparql.clone(),
        })
    }

    async fn select(&self, query: &str) -> KbResult<SparqlResponse> {
        self.http
            .get_json(
                &self.sparql_url,
                &[("query", query), ("format", SPARQL_JSON)],
                SPARQL_JSON,
            )
            .await
    }
}

/// Objects of `predicate` on `subject`, restricted to ontology classes.
pub(crate) fn ontology_query(subject: &str, predicate: &str, var: &str) -> String {
    format!(
        "SELECT DISTINCT ?{var} WHERE {{ {subject} {predicate} ?{var} . \
         FILTER(STRSTARTS(STR(?{var}), \"{prefix}\")) }}",
        var = var,
        subject = subject,
        predicate = predicate,
        prefix = ONTOLOGY_PREFIX
    )
}

#[async_trait]
impl KnowledgeBaseClient for DbpediaClient {
    fn source(&self) -> KnowledgeBase {
        KnowledgeBase::DbPedia
    }

    /// Lookup has no language parameter; labels come back in English.
    async fn search_entities(
        &self,
        query: &str,
        _language: Option<&str>,
        limit: usize,
    ) -> KbResult<Vec<Entity>> {
        let limit = limit.max(1);
        let limit_param = limit.to_string();

        let response: LookupResponse = self
            .http
            .get_json(
                &self.lookup_url,
                &[
                    ("query", query),
                    ("maxResults", &limit_param),
                    ("format", "JSON"),
                ],
                "application/json",
            )
            .await?;
        Ok(response.into_entities(limit))
    }

    async fn entity_types(&self, entity_uri: &str) -> KbResult<Vec<SemanticType>> {
        let Some(subject) = iri(entity_uri) else {
            tracing::debug!(entity_uri, "not a DBpedia IRI, no types");
            return Ok(Vec::new());
        };

        let response = self
            .select(&ontology_query(&subject, RDF_TYPE, "type"))
            .await?;
        Ok(response
            .uris("type")
            .into_iter()
            .map(|uri| SemanticType::from_uri(uri, KnowledgeBase::DbPedia))
            .collect())
    }

    async fn parent_types(&self, type_uri: &str) -> KbResult<Vec<String>> {
        let Some(subject) = iri(type_uri) else {
            return Ok(Vec::new());
        };
        Ok(self
            .select(&ontology_query(&subject, SUBCLASS_OF, "parent"))
            .await?
            .uris("parent"))
    }
}

impl std::fmt::Debug for DbpediaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbpediaClient")
            .field("lookup_url", &self.lookup_url)
            .field("sparql_url", &self.sparql_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ontology_query_shape() {
        let query = ontology_query("<http://dbpedia.org/resource/Paris>", RDF_TYPE, "type");
        assert!(query.starts_with("SELECT DISTINCT ?type WHERE {"));
        assert!(query.contains(
            "<http://dbpedia.org/resource/Paris> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> \
             ?type"
        ));
        assert!(query.contains("STRSTARTS(STR(?type), \"http://dbpedia.org/ontology/\")"));
    }

    #[tokio::test]
    async fn test_non_iri_subject_yields_no_types() {
        let client = DbpediaClient::new(&EndpointConfig::default()).unwrap();
        assert_eq!(client.source(), KnowledgeBase::DbPedia);
        assert!(client.entity_types("Paris").await.unwrap().is_empty());
        assert!(client.parent_types("").await.unwrap().is_empty());
    }
}
