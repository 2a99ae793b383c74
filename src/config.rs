//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::time::Duration;

/// Default maximum number of entries.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Cache configuration parameters.
///
/// `None` means "unbounded" for capacity and "never expires" for ttl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of live entries, None = unbounded
    pub capacity: Option<NonZeroUsize>,
    /// Time-to-live applied to every stored entry, None = no expiry
    pub ttl: Option<Duration>,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - Maximum cache entries, 0 = unbounded (default: 1000)
    /// - `CACHE_TTL_MS` - Entry TTL in milliseconds, 0 = no expiry (default: 0)
    pub fn from_env() -> Self {
        let capacity = env_parse::<usize>("CACHE_CAPACITY").unwrap_or(DEFAULT_CAPACITY);
        let ttl_ms = env_parse::<u64>("CACHE_TTL_MS").unwrap_or(0);

        Self {
            capacity: NonZeroUsize::new(capacity),
            ttl: (ttl_ms > 0).then(|| Duration::from_millis(ttl_ms)),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: NonZeroUsize::new(DEFAULT_CAPACITY),
            ttl: None,
        }
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
