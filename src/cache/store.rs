//! Cache Store Module
//!
//! Main cache engine combining the recency index with capacity eviction and
//! TTL expiration, all behind a single lock.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle as RuntimeHandle;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::cache::{CacheEntry, CacheStats, EvictionReason, Handle, RecencyIndex};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::tasks::spawn_expiry;

/// Callback invoked with the key and value of every entry leaving the cache.
pub type EvictionCallback<V> = Arc<dyn Fn(String, V) + Send + Sync>;

// == Locked State ==
struct State<V> {
    /// Entries ordered by recency
    order: RecencyIndex<CacheEntry<V>>,
    /// Performance statistics
    stats: CacheStats,
    /// Last stamp handed out by `store`
    generation: u64,
}

impl<V> State<V> {
    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }
}

// == Shared Core ==
/// Everything one cache instance owns. Expiry triggers hold a `Weak` to it.
pub(crate) struct Shared<V> {
    state: Mutex<State<V>>,
    capacity: Option<NonZeroUsize>,
    ttl: Option<Duration>,
    on_evicted: Option<EvictionCallback<V>>,
    runtime: Option<RuntimeHandle>,
}

impl<V> Shared<V> {
    // == Eviction ==
    /// Single exit path for entries: cancels the trigger, counts, logs and
    /// calls back. Runs with the lock held.
    fn dispose(
        &self,
        state: &mut State<V>,
        key: String,
        mut entry: CacheEntry<V>,
        reason: EvictionReason,
    ) {
        entry.cancel_expiry();
        state.stats.record_removal(reason);
        debug!(key = %key, ?reason, "Evicted cache entry");

        if let Some(on_evicted) = &self.on_evicted {
            on_evicted(key, entry.value);
        }
    }

    fn evict(&self, state: &mut State<V>, handle: Handle, reason: EvictionReason) -> bool {
        match state.order.remove(handle) {
            Some((key, entry)) => {
                self.dispose(state, key, entry, reason);
                true
            }
            None => false,
        }
    }

    fn evict_oldest(&self, state: &mut State<V>) -> Option<String> {
        let (key, entry) = state.order.pop_back()?;
        let evicted = key.clone();
        self.dispose(state, key, entry, EvictionReason::Capacity);
        Some(evicted)
    }

    fn enforce_capacity(&self, state: &mut State<V>) {
        let Some(capacity) = self.capacity else {
            return;
        };

        while state.order.len() > capacity.get() {
            if self.evict_oldest(state).is_none() {
                break;
            }
        }
    }

    /// Evicts the entry if its TTL has elapsed. Returns true if it did.
    fn expire_if_stale(&self, state: &mut State<V>, handle: Handle, now: Instant) -> bool {
        let expired = state
            .order
            .get(handle)
            .is_some_and(|entry| entry.is_expired_at(now));

        expired && self.evict(state, handle, EvictionReason::Expired)
    }

    // == Background Expiry ==
    /// Entry point for a fired trigger.
    ///
    /// Evicts only if `key` still holds the entry written under `generation`
    /// and that entry is expired; anything else means the trigger is stale.
    pub(crate) fn expire(&self, key: &str, generation: u64) {
        let mut state = self.state.lock();
        let now = Instant::now();

        let Some(handle) = state.order.find(key) else {
            trace!(key = %key, generation, "Expiry trigger found no entry");
            return;
        };

        match state.order.get_mut(handle) {
            Some(entry) if entry.generation == generation && entry.is_expired_at(now) => {
                // This trigger is the one running; nothing left to abort.
                entry.pending_expiry = None;
            }
            _ => {
                trace!(key = %key, generation, "Skipping stale expiry trigger");
                return;
            }
        }

        self.evict(&mut state, handle, EvictionReason::Expired);
    }
}

impl<V> Drop for Shared<V> {
    fn drop(&mut self) {
        for entry in self.state.get_mut().order.values_mut() {
            entry.cancel_expiry();
        }
    }
}

// == LRU Cache ==
/// Thread-safe LRU cache with optional per-entry TTL.
///
/// Cloning is cheap and yields another handle to the same cache.
///
/// The eviction callback runs while the cache lock is held: it must be short
/// and must not call back into the same cache.
pub struct LruCache<V> {
    shared: Arc<Shared<V>>,
}

impl<V> Clone for LruCache<V> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<V> fmt::Debug for LruCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("capacity", &self.shared.capacity)
            .field("ttl", &self.shared.ttl)
            .field("eager_expiry", &self.shared.runtime.is_some())
            .finish_non_exhaustive()
    }
}

impl<V: Send + 'static> LruCache<V> {
    // == Constructors ==
    /// Creates a cache holding at most `capacity` entries, with no TTL.
    ///
    /// A capacity of zero means unbounded; eviction is then left to the
    /// caller through [`remove_oldest`](Self::remove_oldest).
    pub fn new(capacity: usize) -> Self {
        Self::builder().capacity(capacity).build()
    }

    /// Creates a cache from configuration, without an eviction callback.
    pub fn from_config(config: &CacheConfig) -> Self {
        LruCacheBuilder::from_config(config).build()
    }

    pub fn builder() -> LruCacheBuilder<V> {
        LruCacheBuilder::new()
    }

    // == Store ==
    /// Inserts or overwrites `key`.
    ///
    /// An existing entry gets the new value, a fresh TTL and is promoted to
    /// most recently used. If the cache then exceeds capacity, the least
    /// recently used entry is evicted.
    pub fn store(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        let shared = &*self.shared;
        let mut state = shared.state.lock();

        let generation = state.next_generation();
        let expires_at = shared.ttl.map(|ttl| Instant::now() + ttl);

        let handle = match state.order.find(&key) {
            Some(handle) => {
                if let Some(entry) = state.order.get_mut(handle) {
                    entry.refresh(value, expires_at, generation);
                }
                state.order.move_to_front(handle);
                handle
            }
            None => {
                let entry = CacheEntry::new(value, expires_at, generation);
                match state.order.push_front(key.clone(), entry) {
                    Ok(handle) => handle,
                    Err(err) => {
                        warn!(%err, "Recency index rejected new entry");
                        return;
                    }
                }
            }
        };

        if let Some(deadline) = expires_at {
            let trigger = self.schedule_expiry(key, generation, deadline);
            if let Some(entry) = state.order.get_mut(handle) {
                entry.pending_expiry = trigger;
            }
        }

        shared.enforce_capacity(&mut state);
    }

    fn schedule_expiry(
        &self,
        key: String,
        generation: u64,
        deadline: Instant,
    ) -> Option<AbortHandle> {
        let runtime = self.shared.runtime.as_ref()?;
        Some(spawn_expiry(runtime, self.downgrade(), key, generation, deadline))
    }

    pub(crate) fn downgrade(&self) -> Weak<Shared<V>> {
        Arc::downgrade(&self.shared)
    }

    // == Update ==
    /// Replaces the value of an existing entry in place.
    ///
    /// Neither the TTL nor the recency position changes. Returns false (and
    /// does nothing) if the key is absent or found expired.
    pub fn update(&self, key: &str, value: V) -> bool {
        let shared = &*self.shared;
        let mut state = shared.state.lock();

        let Some(handle) = state.order.find(key) else {
            return false;
        };

        if shared.expire_if_stale(&mut state, handle, Instant::now()) {
            return false;
        }

        match state.order.get_mut(handle) {
            Some(entry) => {
                entry.value = value;
                true
            }
            None => false,
        }
    }

    // == Delete ==
    /// Removes `key`, firing the eviction callback. Returns false if absent.
    pub fn delete(&self, key: &str) -> bool {
        let shared = &*self.shared;
        let mut state = shared.state.lock();

        match state.order.find(key) {
            Some(handle) => shared.evict(&mut state, handle, EvictionReason::Removed),
            None => false,
        }
    }

    // == Remove Oldest ==
    /// Evicts the least recently used entry, returning its key.
    pub fn remove_oldest(&self) -> Option<String> {
        let shared = &*self.shared;
        let mut state = shared.state.lock();
        shared.evict_oldest(&mut state)
    }

    // == Clear ==
    /// Removes every entry, firing the eviction callback once per entry.
    pub fn clear(&self) {
        let shared = &*self.shared;
        let mut state = shared.state.lock();

        for (key, entry) in state.order.drain() {
            shared.dispose(&mut state, key, entry, EvictionReason::Cleared);
        }
    }

    // == Purge Expired ==
    /// Evicts every entry whose TTL has elapsed.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        let shared = &*self.shared;
        let mut state = shared.state.lock();
        let now = Instant::now();

        let expired: Vec<String> = state
            .order
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.to_owned())
            .collect();

        let mut count = 0;
        for key in expired {
            if let Some(handle) = state.order.find(&key) {
                if shared.evict(&mut state, handle, EvictionReason::Expired) {
                    count += 1;
                }
            }
        }

        count
    }

    // == Inspection ==
    /// Returns the number of entries, including expired ones not yet reclaimed.
    pub fn len(&self) -> usize {
        self.shared.state.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks for a live entry without touching recency or expiring anything.
    pub fn contains(&self, key: &str) -> bool {
        let state = self.shared.state.lock();
        let now = Instant::now();
        state
            .order
            .find(key)
            .and_then(|handle| state.order.get(handle))
            .is_some_and(|entry| !entry.is_expired_at(now))
    }

    /// Snapshot of all keys, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        self.shared
            .state
            .lock()
            .order
            .keys()
            .map(str::to_owned)
            .collect()
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let state = self.shared.state.lock();
        let mut stats = state.stats.clone();
        stats.set_total_entries(state.order.len());
        stats
    }

    pub fn capacity(&self) -> Option<NonZeroUsize> {
        self.shared.capacity
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.shared.ttl
    }
}

impl<V: Clone + Send + 'static> LruCache<V> {
    // == Load ==
    /// Returns the value for `key` and promotes it to most recently used.
    ///
    /// Fails with `NotFound` if absent, or `Expired` if its TTL had elapsed
    /// (the entry is evicted as a side effect).
    pub fn load(&self, key: &str) -> Result<V> {
        self.lookup(key, true)
    }

    // == Peek ==
    /// Same as [`load`](Self::load) but leaves the recency order untouched.
    pub fn peek(&self, key: &str) -> Result<V> {
        self.lookup(key, false)
    }

    fn lookup(&self, key: &str, promote: bool) -> Result<V> {
        let shared = &*self.shared;
        let mut state = shared.state.lock();

        let Some(handle) = state.order.find(key) else {
            state.stats.record_miss();
            trace!(key = %key, "Cache miss");
            return Err(CacheError::NotFound(key.to_string()));
        };

        if shared.expire_if_stale(&mut state, handle, Instant::now()) {
            state.stats.record_miss();
            return Err(CacheError::Expired(key.to_string()));
        }

        if promote {
            state.order.move_to_front(handle);
        }

        let value = state
            .order
            .get(handle)
            .map(|entry| entry.value.clone())
            .ok_or_else(|| CacheError::NotFound(key.to_string()))?;
        state.stats.record_hit();

        Ok(value)
    }
}

// == Builder ==
/// Configures and creates an [`LruCache`].
pub struct LruCacheBuilder<V> {
    capacity: Option<NonZeroUsize>,
    ttl: Option<Duration>,
    on_evicted: Option<EvictionCallback<V>>,
    runtime: Option<RuntimeHandle>,
}

impl<V> LruCacheBuilder<V> {
    /// Starts from an unbounded cache with no TTL.
    pub fn new() -> Self {
        Self {
            capacity: None,
            ttl: None,
            on_evicted: None,
            runtime: None,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            capacity: config.capacity,
            ttl: config.ttl,
            ..Self::new()
        }
    }

    /// Maximum number of entries; zero means unbounded.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = NonZeroUsize::new(capacity);
        self
    }

    /// TTL applied at every store; zero means entries never expire.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = (!ttl.is_zero()).then_some(ttl);
        self
    }

    /// Callback fired exactly once for every entry that leaves the cache.
    pub fn on_evicted<F>(mut self, on_evicted: F) -> Self
    where
        F: Fn(String, V) + Send + Sync + 'static,
    {
        let on_evicted: EvictionCallback<V> = Arc::new(on_evicted);
        self.on_evicted = Some(on_evicted);
        self
    }

    /// Runtime that runs background expiry triggers.
    ///
    /// Defaults to the runtime current at [`build`](Self::build) time.
    pub fn runtime(mut self, runtime: RuntimeHandle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn build(self) -> LruCache<V> {
        let runtime = match (self.ttl, self.runtime) {
            (None, _) => None,
            (Some(_), Some(runtime)) => Some(runtime),
            (Some(ttl), None) => match RuntimeHandle::try_current() {
                Ok(runtime) => Some(runtime),
                Err(_) => {
                    warn!(
                        ?ttl,
                        "No tokio runtime available, expired entries are only reclaimed on access"
                    );
                    None
                }
            },
        };

        let state = State {
            order: RecencyIndex::new(),
            stats: CacheStats::new(),
            generation: 0,
        };

        LruCache {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                capacity: self.capacity,
                ttl: self.ttl,
                on_evicted: self.on_evicted,
                runtime,
            }),
        }
    }
}

impl<V> Default for LruCacheBuilder<V> {
    fn default() -> Self {
        Self::new()
    }
}
