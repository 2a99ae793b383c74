//! TTL Expiry Task
//!
//! Background trigger that evicts a single entry once its deadline passes.

use std::sync::Weak;

use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::{self, Instant};
use tracing::trace;

use crate::cache::Shared;

/// Spawns a trigger that expires `key` at `deadline`.
///
/// The task holds only a weak reference, so it never keeps a dropped cache
/// alive. When it fires it takes the cache lock and evicts the entry only if
/// it still carries `generation`; a refreshed or deleted key is left alone.
///
/// # Returns
/// An AbortHandle the entry keeps so that a refresh or removal can cancel
/// the trigger before it fires.
pub(crate) fn spawn_expiry<V>(
    runtime: &Handle,
    cache: Weak<Shared<V>>,
    key: String,
    generation: u64,
    deadline: Instant,
) -> AbortHandle
where
    V: Send + 'static,
{
    runtime
        .spawn(async move {
            time::sleep_until(deadline).await;

            match cache.upgrade() {
                Some(shared) => shared.expire(&key, generation),
                None => trace!(key = %key, "Cache dropped before expiry fired"),
            }
        })
        .abort_handle()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::cache::LruCache;

    #[tokio::test(start_paused = true)]
    async fn test_trigger_can_be_aborted() {
        let cache: LruCache<i32> = LruCache::builder()
            .ttl(Duration::from_secs(1))
            .build();
        cache.store("k", 1);

        let trigger = spawn_expiry(
            &Handle::current(),
            cache.downgrade(),
            "k".to_string(),
            1,
            Instant::now() + Duration::from_secs(5),
        );
        trigger.abort();

        // The entry's own trigger still fires at one second
        time::sleep(Duration::from_millis(1100)).await;
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_after_cache_dropped() {
        let cache: LruCache<i32> = LruCache::new(4);
        let weak = cache.downgrade();
        drop(cache);

        let trigger = spawn_expiry(
            &Handle::current(),
            weak,
            "k".to_string(),
            1,
            Instant::now() + Duration::from_millis(10),
        );

        time::sleep(Duration::from_millis(50)).await;
        assert!(trigger.is_finished());
    }
}
