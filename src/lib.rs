//! TTL LRU - An embeddable thread-safe cache
//!
//! Provides strict LRU eviction with optional per-entry TTL expiration,
//! enforced both on access and by background triggers.

pub mod cache;
pub mod config;
pub mod error;
mod tasks;

pub use cache::{Cache, CacheStats, EvictionReason, LruCache, LruCacheBuilder};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
