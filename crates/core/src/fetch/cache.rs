//! In-flight request deduplication
//!
//! [`FetchCache`] keeps at most one outstanding fetch per key. Concurrent
//! callers for the same key share that fetch and see the same result. Nothing
//! is retained once a fetch settles, so a failed fetch is retried by the very
//! next caller.
//!
//! The fetch runs on its own task. Callers that go away do not cancel it and
//! the key is always released when it settles.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::{debug, trace};
use washslot_domain::{Result, WashSlotError};

/// Handle to an in-flight fetch. Cloneable; every clone resolves to the same
/// value.
pub type SharedFetch<V> = Shared<BoxFuture<'static, Result<V>>>;

struct InFlight<V: Clone> {
    generation: u64,
    fetch: SharedFetch<V>,
}

struct Registry<K, V: Clone> {
    in_flight: Mutex<HashMap<K, InFlight<V>>>,
    next_generation: AtomicU64,
    started: AtomicU64,
    joined: AtomicU64,
}

impl<K: Eq + Hash, V: Clone> Registry<K, V> {
    /// Drop the entry for `key` only if it is still the one registered under
    /// `generation`.
    fn release(&self, key: &K, generation: u64) {
        let mut in_flight = self.in_flight.lock();
        if in_flight.get(key).is_some_and(|entry| entry.generation == generation) {
            in_flight.remove(key);
        }
    }
}

/// Point-in-time counters for a [`FetchCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchCacheStats {
    /// Factories invoked.
    pub started: u64,
    /// Callers that attached to a fetch already in flight.
    pub joined: u64,
    /// Keys with a fetch currently outstanding.
    pub in_flight: usize,
}

/// Deduplicates concurrent fetches of identical remote state.
pub struct FetchCache<K, V: Clone> {
    registry: Arc<Registry<K, V>>,
}

impl<K, V> Clone for FetchCache<K, V>
where
    V: Clone,
{
    fn clone(&self) -> Self {
        Self { registry: Arc::clone(&self.registry) }
    }
}

impl<K, V> Default for FetchCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> FetchCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry {
                in_flight: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
                started: AtomicU64::new(0),
                joined: AtomicU64::new(0),
            }),
        }
    }

    /// Return the outstanding fetch for `key`, or start one with `factory`.
    ///
    /// `factory` is only invoked when no fetch for `key` is in flight. It must
    /// carry its own deadline; the cache never times a fetch out.
    pub fn get_or_fetch<F, Fut>(&self, key: K, factory: F) -> SharedFetch<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let mut in_flight = self.registry.in_flight.lock();

        if let Some(entry) = in_flight.get(&key) {
            self.registry.joined.fetch_add(1, Ordering::Relaxed);
            trace!(generation = entry.generation, "joined in-flight fetch");
            return entry.fetch.clone();
        }

        self.register(&mut in_flight, key, factory)
    }

    /// Like [`get_or_fetch`](Self::get_or_fetch), but only joins a fetch
    /// registered at or after `watermark`.
    ///
    /// An older fetch for `key` is awaited (its outcome ignored) and then
    /// replaced by a fresh one, so the result reflects remote state no older
    /// than the moment `watermark` was taken. At most one fetch per key is
    /// outstanding throughout.
    pub async fn get_or_fetch_after<F, Fut>(&self, key: K, watermark: u64, factory: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let mut factory = Some(factory);
        loop {
            let (fetch, current) = {
                let mut in_flight = self.registry.in_flight.lock();
                let existing = in_flight.get(&key).map(|entry| (entry.generation, entry.fetch.clone()));
                match existing {
                    Some((generation, fetch)) if generation >= watermark => {
                        self.registry.joined.fetch_add(1, Ordering::Relaxed);
                        trace!(generation, "joined fresh in-flight fetch");
                        (fetch, true)
                    }
                    Some((generation, fetch)) => {
                        debug!(generation, watermark, "waiting out older fetch");
                        (fetch, false)
                    }
                    None => match factory.take() {
                        Some(factory) => (self.register(&mut in_flight, key.clone(), factory), true),
                        None => {
                            return Err(WashSlotError::Internal(
                                "fetch factory already consumed".into(),
                            ))
                        }
                    },
                }
            };

            if current {
                return fetch.await;
            }
            // Older fetch; its entry is released once it settles.
            let _ = fetch.await;
        }
    }

    /// Generation the next registered fetch will carry. Any fetch registered
    /// after this call has a generation at or above the returned value.
    pub fn watermark(&self) -> u64 {
        self.registry.next_generation.load(Ordering::SeqCst)
    }

    fn register<F, Fut>(
        &self,
        in_flight: &mut HashMap<K, InFlight<V>>,
        key: K,
        factory: F,
    ) -> SharedFetch<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let generation = self.registry.next_generation.fetch_add(1, Ordering::SeqCst);
        self.registry.started.fetch_add(1, Ordering::Relaxed);

        // The release on settle needs the registry lock, held by the caller,
        // so it cannot run before the entry below is inserted.
        let registry = Arc::clone(&self.registry);
        let release_key = key.clone();
        let work = factory();
        let task = tokio::spawn(async move {
            let result = work.await;
            registry.release(&release_key, generation);
            result
        });

        let fetch: SharedFetch<V> = async move {
            match task.await {
                Ok(result) => result,
                Err(join_err) => {
                    Err(WashSlotError::Internal(format!("fetch task failed: {join_err}")))
                }
            }
        }
        .boxed()
        .shared();

        in_flight.insert(key, InFlight { generation, fetch: fetch.clone() });
        debug!(generation, in_flight = in_flight.len(), "started fetch");
        fetch
    }

    /// Whether a fetch for `key` is outstanding.
    pub fn is_in_flight(&self, key: &K) -> bool {
        self.registry.in_flight.lock().contains_key(key)
    }

    pub fn stats(&self) -> FetchCacheStats {
        FetchCacheStats {
            started: self.registry.started.load(Ordering::Relaxed),
            joined: self.registry.joined.load(Ordering::Relaxed),
            in_flight: self.registry.in_flight.lock().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use tokio::sync::Notify;

    use super::*;

    #[tokio::test]
    async fn independent_keys_do_not_share() {
        let cache: FetchCache<u32, String> = FetchCache::new();

        let a = cache.get_or_fetch(1, || async { Ok("one".to_string()) });
        let b = cache.get_or_fetch(2, || async { Ok("two".to_string()) });

        assert_eq!(a.await.unwrap(), "one");
        assert_eq!(b.await.unwrap(), "two");
        assert_eq!(cache.stats().started, 2);
        assert_eq!(cache.stats().joined, 0);
    }

    #[tokio::test]
    async fn entry_is_released_even_when_callers_drop() {
        let cache: FetchCache<u32, u32> = FetchCache::new();
        let gate = Arc::new(Notify::new());
        let wait = gate.clone();

        let fetch = cache.get_or_fetch(7, move || async move {
            wait.notified().await;
            Ok(7)
        });
        drop(fetch);
        assert!(cache.is_in_flight(&7));

        gate.notify_one();
        let released = washslot_common::testing::poll_until(
            Duration::from_secs(1),
            Duration::from_millis(5),
            || !cache.is_in_flight(&7),
        )
        .await;
        assert!(released);
    }

    #[tokio::test]
    async fn settled_key_starts_fresh_fetch() {
        let cache: FetchCache<&'static str, usize> = FetchCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for expected in 1..=2 {
            let counter = calls.clone();
            let value = cache
                .get_or_fetch("k", move || async move { Ok(counter.fetch_add(1, Ordering::SeqCst) + 1) })
                .await
                .unwrap();
            assert_eq!(value, expected);
        }
        assert_eq!(cache.stats().started, 2);
        assert_eq!(cache.stats().in_flight, 0);
    }

    #[tokio::test]
    async fn fetch_after_watermark_waits_out_older_fetch() {
        let cache: FetchCache<u32, &'static str> = FetchCache::new();
        let gate = Arc::new(Notify::new());
        let wait = gate.clone();

        let older = cache.get_or_fetch(1, move || async move {
            wait.notified().await;
            Ok("before")
        });
        let watermark = cache.watermark();

        let fresh = tokio::spawn({
            let cache = cache.clone();
            async move { cache.get_or_fetch_after(1, watermark, || async { Ok("after") }).await }
        });
        tokio::task::yield_now().await;
        assert_eq!(cache.stats().started, 1);

        gate.notify_one();
        assert_eq!(older.await.unwrap(), "before");
        assert_eq!(fresh.await.unwrap().unwrap(), "after");
        assert_eq!(cache.stats().started, 2);
        assert_eq!(cache.stats().joined, 0);
    }

    #[tokio::test]
    async fn fetch_after_watermark_joins_newer_fetch() {
        let cache: FetchCache<u32, u32> = FetchCache::new();
        let watermark = cache.watermark();
        let gate = Arc::new(Notify::new());
        let wait = gate.clone();

        let newer = cache.get_or_fetch(1, move || async move {
            wait.notified().await;
            Ok(5)
        });
        let joined = tokio::spawn({
            let cache = cache.clone();
            async move { cache.get_or_fetch_after(1, watermark, || async { Ok(99) }).await }
        });
        tokio::task::yield_now().await;

        gate.notify_one();
        assert_eq!(newer.await.unwrap(), 5);
        assert_eq!(joined.await.unwrap().unwrap(), 5);
        assert_eq!(cache.stats().started, 1);
        assert_eq!(cache.stats().joined, 1);
    }
}
