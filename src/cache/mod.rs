//! Cache Module
//!
//! Provides in-process caching with LRU eviction and TTL expiration.

mod entry;
mod recency;
mod stats;
mod store;
mod traits;


// Re-export public types
pub use entry::CacheEntry;
pub use recency::{Handle, Iter, RecencyIndex};
pub use stats::{CacheStats, EvictionReason};
pub use store::{EvictionCallback, LruCache, LruCacheBuilder};
pub use traits::Cache;

pub(crate) use store::Shared;
