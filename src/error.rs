//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
///
/// `NotFound` and `Expired` are ordinary lookup outcomes, not failures of the
/// cache itself. Callers usually treat both as a miss.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Key was present but its TTL had elapsed
    #[error("Key expired: {0}")]
    Expired(String),

    /// Key is already tracked by the recency index
    #[error("Key already exists: {0}")]
    KeyExists(String),
}

impl CacheError {
    /// Returns true for both miss outcomes (absent or expired).
    pub fn is_miss(&self) -> bool {
        matches!(self, CacheError::NotFound(_) | CacheError::Expired(_))
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
