//! Cache Trait Module
//!
//! The load/store/delete surface shared by cache backends, so a wrapper can
//! compose several of them (for example a fast in-memory tier in front of a
//! durable one) without knowing their concrete types.

use crate::cache::LruCache;
use crate::error::Result;

// == Cache Trait ==
pub trait Cache<V>: Send + Sync {
    /// Returns the value for `key`, or a `NotFound`/`Expired` miss.
    fn load(&self, key: &str) -> Result<V>;

    /// Inserts or overwrites `key`.
    fn store(&self, key: String, value: V);

    /// Removes `key`. Returns false if it was absent.
    fn delete(&self, key: &str) -> bool;
}

impl<V: Clone + Send + 'static> Cache<V> for LruCache<V> {
    fn load(&self, key: &str) -> Result<V> {
        LruCache::load(self, key)
    }

    fn store(&self, key: String, value: V) {
        LruCache::store(self, key, value)
    }

    fn delete(&self, key: &str) -> bool {
        LruCache::delete(self, key)
    }
}
