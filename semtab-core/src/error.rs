//! Error types for SemTab operations

use crate::KnowledgeBase;
use thiserror::Error;

/// Knowledge-base access errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KnowledgeBaseError {
    #[error("Request to {kb} failed with status {status}: {message}")]
    RequestFailed {
        kb: KnowledgeBase,
        status: i32,
        message: String,
    },

    #[error("Rate limited by {kb}, retry after {retry_after_ms}ms")]
    RateLimited { kb: KnowledgeBase, retry_after_ms: i64 },

    #[error("Invalid response from {kb}: {reason}")]
    InvalidResponse { kb: KnowledgeBase, reason: String },

    #[error("{operation} on {kb} timed out after {timeout_ms}ms")]
    Timeout {
        kb: KnowledgeBase,
        operation: String,
        timeout_ms: u64,
    },

    #[error("{operation} on {kb} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        kb: KnowledgeBase,
        operation: String,
        attempts: u32,
        last_error: String,
    },
}

impl KnowledgeBaseError {
    /// Which knowledge base produced this error.
    pub fn knowledge_base(&self) -> KnowledgeBase {
        match self {
            Self::RequestFailed { kb, .. }
            | Self::RateLimited { kb, .. }
            | Self::InvalidResponse { kb, .. }
            | Self::Timeout { kb, .. }
            | Self::RetriesExhausted { kb, .. } => *kb,
        }
    }

    /// Whether another attempt of the same call may succeed.
    ///
    /// Connection failures (status 0), server errors, rate limiting and
    /// timeouts are transient. Client errors and undecodable payloads are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RequestFailed { status, .. } => *status == 0 || *status >= 500,
            Self::RateLimited { .. } | Self::Timeout { .. } => true,
            Self::InvalidResponse { .. } | Self::RetriesExhausted { .. } => false,
        }
    }

    /// Server-advertised wait before the next attempt, if any.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after_ms, .. } if *retry_after_ms > 0 => {
                Some(*retry_after_ms as u64)
            }
            _ => None,
        }
    }
}

/// Input validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Empty input: {what}")]
    EmptyInput { what: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Row {row} has {got} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        got: usize,
    },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to parse configuration: {reason}")]
    Parse { reason: String },

    #[error("Failed to read configuration from {path}: {reason}")]
    Io { path: String, reason: String },
}

/// Master error type for all SemTab errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SemtabError {
    #[error("Knowledge base error: {0}")]
    KnowledgeBase(#[from] KnowledgeBaseError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for SemTab operations.
pub type SemtabResult<T> = Result<T, SemtabError>;

/// Shorthand used by the configuration validators.
pub(crate) fn invalid_config(
    field: &str,
    value: impl ToString,
    reason: impl Into<String>,
) -> SemtabError {
    SemtabError::Config(ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    })
}

// =============================================================================
// TESTS
// =============================================================================
