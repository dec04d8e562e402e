//! Knowledge-base client implementations
//!
//! HTTP clients for the public Wikidata and DBpedia endpoints. Both share
//! [`HttpCore`] for rate limiting and status mapping, and [`sparql`] for
//! query construction and result decoding.

pub mod dbpedia;
pub mod http;
pub mod sparql;
pub mod wikidata;

pub use dbpedia::DbpediaClient;
pub use http::HttpCore;
pub use wikidata::WikidataClient;

use semtab_core::{KnowledgeBase, KnowledgeBaseError};

pub(crate) fn request_failed(
    kb: KnowledgeBase,
    status: i32,
    message: impl Into<String>,
) -> KnowledgeBaseError {
    KnowledgeBaseError::RequestFailed {
        kb,
        status,
        message: message.into(),
    }
}

pub(crate) fn rate_limited(kb: KnowledgeBase, retry_after_ms: i64) -> KnowledgeBaseError {
    KnowledgeBaseError::RateLimited { kb, retry_after_ms }
}

pub(crate) fn invalid_response(kb: KnowledgeBase, reason: impl Into<String>) -> KnowledgeBaseError {
    KnowledgeBaseError::InvalidResponse {
        kb,
        reason: reason.into(),
    }
}

/// Confidence assigned to the result at `rank` when the service gives no score.
pub(crate) fn rank_confidence(rank: usize) -> f64 {
    (0.9 - 0.1 * rank as f64).max(0.1)
}
