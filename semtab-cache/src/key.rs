//! Deterministic cache keys.
//!
//! A key is derived from the knowledge base, the kind of lookup, the
//! normalized subject and a canonical (key-sorted) parameter map. Two
//! logically identical lookups always produce the same key regardless of
//! parameter order or incidental whitespace and case in the query text.

use semtab_core::KnowledgeBase;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Field separator inside the hashed signature.
const SEPARATOR: u8 = 0x1F;

/// Kind of knowledge-base lookup a key stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LookupKind {
    /// Free-text entity search.
    Search,
    /// Types of one entity.
    Types,
    /// Immediate parents of one type.
    Parents,
}

impl LookupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Types => "types",
            Self::Parents => "parents",
        }
    }
}

/// Normalize free-text query: trim, lowercase, collapse inner whitespace.
pub fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Cache key for one knowledge-base lookup.
///
/// Only the digest takes part in equality and hashing. The knowledge base
/// and lookup kind are kept alongside so the cache can route and report.
#[derive(Debug, Clone)]
pub struct CacheKey {
    kb: KnowledgeBase,
    kind: LookupKind,
    digest: String,
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.digest == other.digest
    }
}

impl Eq for CacheKey {}

impl std::hash::Hash for CacheKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.digest.hash(state);
    }
}

impl CacheKey {
    /// Build a key from a subject and an arbitrary parameter list.
    ///
    /// Search subjects are normalized with [`normalize_query`]. Type and
    /// parent lookups take URIs, which are compared exactly and only trimmed.
    /// Parameters are sorted by name; a repeated name keeps its last value.
    pub fn new(
        kb: KnowledgeBase,
        kind: LookupKind,
        subject: &str,
        params: &[(&str, &str)],
    ) -> Self {
        let subject = match kind {
            LookupKind::Search => normalize_query(subject),
            LookupKind::Types | LookupKind::Parents => subject.trim().to_string(),
        };
        let canonical: BTreeMap<&str, &str> = params.iter().copied().collect();

        let mut hasher = Sha256::new();
        hasher.update(kb.as_str().as_bytes());
        hasher.update([SEPARATOR]);
        hasher.update(kind.as_str().as_bytes());
        hasher.update([SEPARATOR]);
        hasher.update(subject.as_bytes());
        for (name, value) in canonical {
            hasher.update([SEPARATOR]);
            hasher.update(name.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
        }

        Self {
            kb,
            kind,
            digest: hex::encode(hasher.finalize()),
        }
    }

    /// Key for an entity search.
    pub fn search(kb: KnowledgeBase, query: &str, language: Option<&str>, limit: usize) -> Self {
        let limit = limit.to_string();
        match language {
            Some(lang) => Self::new(
                kb,
                LookupKind::Search,
                query,
                &[("lang", lang), ("limit", &limit)],
            ),
            None => Self::new(kb, LookupKind::Search, query, &[("limit", &limit)]),
        }
    }

    /// Key for the types of an entity.
    pub fn types(kb: KnowledgeBase, entity_uri: &str) -> Self {
        Self::new(kb, LookupKind::Types, entity_uri, &[])
    }

    /// Key for the immediate parents of a type.
    pub fn parents(kb: KnowledgeBase, type_uri: &str) -> Self {
        Self::new(kb, LookupKind::Parents, type_uri, &[])
    }

    pub fn knowledge_base(&self) -> KnowledgeBase {
        self.kb
    }

    pub fn kind(&self) -> LookupKind {
        self.kind
    }

    /// Hex-encoded SHA-256 of the canonical signature.
    pub fn digest(&self) -> &str {
        &self.digest
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.kb, self.kind.as_str(), &self.digest[..12])
    }
}
