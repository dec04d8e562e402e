//! The result cache is read and written from many tasks at once.

use semtab_cache::{CacheKey, CachedLookup, ResultCache};
use semtab_core::{CacheLimits, CacheSettings, Entity, KnowledgeBase};
use std::sync::Arc;
use std::thread;

fn entity(n: usize) -> Entity {
    Entity::new(
        format!("http://www.wikidata.org/entity/Q{}", n),
        format!("item {}", n),
        KnowledgeBase::Wikidata,
        0.5,
    )
}

#[test]
fn concurrent_writers_and_readers_agree() {
    let cache = Arc::new(ResultCache::default());

    thread::scope(|scope| {
        for worker in 0..4 {
            let cache = Arc::clone(&cache);
            scope.spawn(move || {
                for n in 0..100 {
                    let query = format!("q{}", n);
                    let key = CacheKey::search(KnowledgeBase::Wikidata, &query, Some("en"), 10);
                    if let Some(found) = cache.entities(&key) {
                        assert_eq!(found, vec![entity(n)]);
                    }
                    // Duplicate writes of the same completed lookup are allowed.
                    if n % 4 == worker {
                        cache.put(key, CachedLookup::Entities(vec![entity(n)]));
                    }
                }
            });
        }
    });

    assert_eq!(cache.len(KnowledgeBase::Wikidata), 100);
    for n in 0..100 {
        let key = CacheKey::search(KnowledgeBase::Wikidata, &format!("Q{}", n), Some("en"), 10);
        assert_eq!(cache.entities(&key), Some(vec![entity(n)]));
    }
}

#[test]
fn repeated_completed_lookups_overwrite() {
    let settings = CacheSettings {
        wikidata: CacheLimits {
            max_entries: 2,
            max_age: None,
        },
        ..Default::default()
    };
    let cache = ResultCache::new(&settings);
    let key = CacheKey::search(KnowledgeBase::Wikidata, "Berlin", Some("en"), 10);

    cache.put(key.clone(), CachedLookup::Entities(vec![]));
    cache.put(key.clone(), CachedLookup::Entities(vec![entity(64)]));

    assert_eq!(cache.len(KnowledgeBase::Wikidata), 1);
    assert_eq!(cache.entities(&key), Some(vec![entity(64)]));
    assert_eq!(cache.stats(KnowledgeBase::Wikidata).evictions, 0);
}
