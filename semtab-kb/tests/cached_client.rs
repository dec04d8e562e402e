//! Caching and retry behaviour of the knowledge-base decorator.

use semtab_cache::ResultCache;
use semtab_core::{KnowledgeBase, KnowledgeBaseError};
use semtab_kb::{CachedKnowledgeBase, KnowledgeBaseClient};
use semtab_test_utils::fixtures::{
    country_city_dbpedia, country_city_wikidata, dbo, dbr, fast_config, wd,
};
use semtab_test_utils::{init_test_tracing, StubKnowledgeBase};
use std::sync::Arc;

fn cached(stub: &Arc<StubKnowledgeBase>, cache: &ResultCache) -> CachedKnowledgeBase {
    CachedKnowledgeBase::new(stub.clone(), cache.clone(), fast_config().retry)
}

#[tokio::test]
async fn second_lookup_is_served_from_cache() {
    init_test_tracing();
    let stub = Arc::new(country_city_wikidata());
    let cache = ResultCache::default();
    let client = cached(&stub, &cache);

    let first = client.search_entities("Paris", Some("en"), 10).await.unwrap();
    let second = client.search_entities("  PARIS ", Some("en"), 10).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(stub.search_calls(), 1);
    assert_eq!(cache.stats(KnowledgeBase::Wikidata).hits, 1);
}

#[tokio::test]
async fn empty_answers_are_cached() {
    let stub = Arc::new(country_city_dbpedia());
    let cache = ResultCache::default();
    let client = cached(&stub, &cache);

    assert!(client.search_entities("Atlantis", None, 10).await.unwrap().is_empty());
    assert!(client.search_entities("Atlantis", None, 10).await.unwrap().is_empty());
    assert_eq!(stub.search_calls(), 1);
}

#[tokio::test]
async fn types_and_parents_are_cached_separately() {
    let stub = Arc::new(country_city_dbpedia().with_parents(&dbo("City"), &[&dbo("Settlement")]));
    let cache = ResultCache::default();
    let client = cached(&stub, &cache);

    for _ in 0..2 {
        let types = client.entity_types(&dbr("Paris")).await.unwrap();
        assert_eq!(types[0].uri, dbo("City"));
        let parents = client.parent_types(&dbo("City")).await.unwrap();
        assert_eq!(parents, vec![dbo("Settlement")]);
    }

    assert_eq!(stub.type_calls(), 1);
    assert_eq!(stub.parent_calls(), 1);
    assert_eq!(cache.len(KnowledgeBase::DbPedia), 2);
}

#[tokio::test]
async fn transient_failure_is_retried() {
    let stub = Arc::new(country_city_wikidata());
    let cache = ResultCache::default();
    let client = cached(&stub, &cache);

    stub.fail_next(1);
    let found = client.search_entities("Berlin", Some("en"), 10).await.unwrap();

    assert_eq!(found[0].uri, wd("Q64"));
    assert_eq!(stub.search_calls(), 2);
}

#[tokio::test]
async fn failures_are_not_cached() {
    let stub = Arc::new(country_city_wikidata());
    let cache = ResultCache::default();
    let client = cached(&stub, &cache);

    stub.set_unavailable(true);
    let err = client.search_entities("Berlin", Some("en"), 10).await.unwrap_err();
    assert!(matches!(err, KnowledgeBaseError::RetriesExhausted { attempts: 2, .. }));
    assert_eq!(cache.total_len(), 0);

    stub.set_unavailable(false);
    let found = client.search_entities("Berlin", Some("en"), 10).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(stub.search_calls(), 3);
}

#[tokio::test]
async fn cache_is_shared_between_clients() {
    let wikidata = Arc::new(country_city_wikidata());
    let cache = ResultCache::default();

    cached(&wikidata, &cache)
        .search_entities("France", Some("en"), 10)
        .await
        .unwrap();
    cached(&wikidata, &cache)
        .search_entities("France", Some("en"), 10)
        .await
        .unwrap();

    assert_eq!(wikidata.search_calls(), 1);
}
