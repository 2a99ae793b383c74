//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::Duration;

use tokio::task::AbortHandle;
use tokio::time::Instant;

// == Cache Entry ==
/// Represents a single cache entry with value and expiry metadata.
#[derive(Debug)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Expiration instant, None = no expiration
    pub expires_at: Option<Instant>,
    /// Stamp of the Store that last wrote this entry
    pub generation: u64,
    /// Background trigger scheduled for `expires_at`
    pub pending_expiry: Option<AbortHandle>,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry with no trigger attached yet.
    pub fn new(value: V, expires_at: Option<Instant>, generation: u64) -> Self {
        Self {
            value,
            expires_at,
            generation,
            pending_expiry: None,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired as of `now`.
    ///
    /// An entry is expired once `now >= expires_at`, so a TTL that has fully
    /// elapsed is never served.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    // == Time To Live ==
    /// Returns remaining TTL, or None if no expiration is set.
    ///
    /// Returns `Some(Duration::ZERO)` once the entry has expired.
    pub fn ttl_remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|expires| expires.saturating_duration_since(Instant::now()))
    }

    // == Refresh ==
    /// Replaces value, deadline and stamp, cancelling any pending trigger.
    pub fn refresh(&mut self, value: V, expires_at: Option<Instant>, generation: u64) {
        self.cancel_expiry();
        self.value = value;
        self.expires_at = expires_at;
        self.generation = generation;
    }

    // == Cancel Expiry ==
    /// Aborts the pending background trigger, if any.
    pub fn cancel_expiry(&mut self) {
        if let Some(trigger) = self.pending_expiry.take() {
            trigger.abort();
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_creation_no_ttl() {
        let entry = CacheEntry::new("test_value", None, 1);

        assert_eq!(entry.value, "test_value");
        assert!(entry.expires_at.is_none());
        assert!(entry.pending_expiry.is_none());
        assert!(!entry.is_expired());
        assert!(entry.ttl_remaining().is_none());
    }

    #[test]
    fn test_entry_creation_with_ttl() {
        let expires = Instant::now() + Duration::from_secs(60);
        let entry = CacheEntry::new("test_value", Some(expires), 1);

        assert!(!entry.is_expired());
        let remaining = entry.ttl_remaining().unwrap();
        assert!(remaining <= Duration::from_secs(60));
        assert!(remaining >= Duration::from_secs(59));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let now = Instant::now();
        let entry = CacheEntry::new("test", Some(now), 1);

        // Expired when current time >= expires_at
        assert!(entry.is_expired_at(now), "Entry should be expired at boundary");
        assert!(!entry.is_expired_at(now - Duration::from_millis(1)));
        assert_eq!(entry.ttl_remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn test_refresh_replaces_value_and_stamp() {
        let mut entry = CacheEntry::new(1, Some(Instant::now()), 1);

        entry.refresh(2, None, 7);

        assert_eq!(entry.value, 2);
        assert_eq!(entry.generation, 7);
        assert!(!entry.is_expired());
    }

    #[tokio::test]
    async fn test_cancel_expiry_aborts_trigger() {
        let task = tokio::spawn(std::future::pending::<()>());
        let mut entry = CacheEntry::new("v", None, 1);
        entry.pending_expiry = Some(task.abort_handle());

        entry.cancel_expiry();

        assert!(entry.pending_expiry.is_none());
        assert!(task.await.unwrap_err().is_cancelled());
    }
}
