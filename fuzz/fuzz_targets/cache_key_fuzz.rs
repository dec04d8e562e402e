//! Fuzz test for cache key canonicalisation
//!
//! Input lines of the form `name=value` become a parameter list. The key
//! must not depend on the order of that list, and must ignore ASCII case
//! and surrounding whitespace in search subjects.
//!
//! Run with: cargo +nightly fuzz run cache_key_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use semtab_cache::{CacheKey, LookupKind};
use semtab_core::KnowledgeBase;
use std::collections::HashSet;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let mut lines = input.lines();
    let subject = lines.next().unwrap_or_default();

    // A repeated name keeps its last value, so only distinct names permute freely.
    let mut names = HashSet::new();
    let params: Vec<(&str, &str)> = lines
        .filter_map(|line| line.split_once('='))
        .filter(|(name, _)| names.insert(*name))
        .collect();
    let mut reversed = params.clone();
    reversed.reverse();
    let mut rotated = params.clone();
    if !rotated.is_empty() {
        rotated.rotate_left(1);
    }

    for kind in [LookupKind::Search, LookupKind::Types, LookupKind::Parents] {
        let key = CacheKey::new(KnowledgeBase::Wikidata, kind, subject, &params);
        assert_eq!(key, CacheKey::new(KnowledgeBase::Wikidata, kind, subject, &reversed));
        assert_eq!(key, CacheKey::new(KnowledgeBase::Wikidata, kind, subject, &rotated));
        assert_eq!(key.digest().len(), 64);
    }

    if subject.is_ascii() {
        let search = CacheKey::new(KnowledgeBase::DbPedia, LookupKind::Search, subject, &params);
        let padded = format!("  {}\t", subject.to_ascii_uppercase());
        assert_eq!(
            search,
            CacheKey::new(KnowledgeBase::DbPedia, LookupKind::Search, &padded, &params)
        );
    }
});
