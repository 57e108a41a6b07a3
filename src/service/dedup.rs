//! In-flight request sharing.
//!
//! Concurrent identical requests (same [`CacheKey`]) are served by a
//! single upstream call: the first caller becomes the leader and runs
//! the fetch, later callers attach to the leader's in-flight entry and
//! block on its completion signal. The check-and-register step is one
//! lock acquisition, which is what guarantees at most one upstream call
//! per key at any instant; the fetch itself runs outside the lock so a
//! slow vendor never serializes unrelated keys.
//!
//! An in-flight entry is strictly shorter-lived than the call that
//! created it: a drop guard removes it even if the leader's future is
//! cancelled or panics, in which case waiters observe the closed
//! channel and report the fetch as abandoned.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, warn};
use serde::Serialize;
use tokio::sync::watch;

use crate::errors::MarketDataError;
use crate::models::CacheKey;

/// Default bound on how long a waiter blocks on someone else's fetch.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of one deduplicated execution.
#[derive(Clone, Debug)]
pub struct DedupResult<T> {
    pub value: T,
    /// True when this caller attached to another caller's in-flight fetch
    pub shared: bool,
}

/// Deduplicator counters.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct DedupStats {
    /// Logical requests that entered `execute`
    pub requests: u64,
    /// Requests that attached to an existing in-flight fetch
    pub deduplicated: u64,
    /// Requests that actually invoked the fetch function
    pub upstream_calls: u64,
    /// Currently registered in-flight fetches
    pub in_flight: usize,
}

/// Collapses concurrent identical requests into one upstream call.
///
/// Generic over the shared value type, which must be cheap to clone —
/// the service shares `Arc`-backed fetch outcomes.
pub struct RequestDeduplicator<T> {
    in_flight: Mutex<HashMap<CacheKey, watch::Receiver<Option<T>>>>,
    wait_timeout: Duration,
    requests: AtomicU64,
    deduplicated: AtomicU64,
    upstream_calls: AtomicU64,
}

impl<T: Clone + Send + Sync + 'static> RequestDeduplicator<T> {
    pub fn new(wait_timeout: Duration) -> Self {
        Self {
            in_flight: Mutex::new(HashMap::new()),
            wait_timeout,
            requests: AtomicU64::new(0),
            deduplicated: AtomicU64::new(0),
            upstream_calls: AtomicU64::new(0),
        }
    }

    /// Lock the registry, recovering from poison if necessary.
    fn lock_registry(&self) -> MutexGuard<'_, HashMap<CacheKey, watch::Receiver<Option<T>>>> {
        self.in_flight.lock().unwrap_or_else(|poisoned| {
            warn!("Deduplicator registry mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Run `fetch` for `key`, sharing the result with concurrent callers.
    ///
    /// The first caller for a key runs `fetch` and publishes the result
    /// to every waiter. Waiters block up to the configured timeout;
    /// exceeding it raises [`MarketDataError::DedupTimeout`] for that
    /// waiter only — the original fetch still completes for the others.
    pub async fn execute<F, Fut>(
        &self,
        key: &CacheKey,
        fetch: F,
    ) -> Result<DedupResult<T>, MarketDataError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        self.requests.fetch_add(1, Ordering::Relaxed);

        // Check-and-register under a single lock acquisition.
        let role = {
            let mut registry = self.lock_registry();
            match registry.get(key) {
                Some(rx) => Role::Waiter(rx.clone()),
                None => {
                    let (tx, rx) = watch::channel(None);
                    registry.insert(key.clone(), rx);
                    Role::Leader(tx)
                }
            }
        };

        match role {
            Role::Leader(tx) => {
                self.upstream_calls.fetch_add(1, Ordering::Relaxed);
                let guard = InFlightGuard { dedup: self, key };

                // Runs with no lock held.
                let value = fetch().await;

                // Publish before deregistering; waiters hold their own
                // receiver clones either way.
                let _ = tx.send(Some(value.clone()));
                drop(guard);

                Ok(DedupResult {
                    value,
                    shared: false,
                })
            }
            Role::Waiter(mut rx) => {
                self.deduplicated.fetch_add(1, Ordering::Relaxed);
                debug!("Attaching to in-flight request: {}", key);

                let wait = async {
                    loop {
                        if let Some(value) = rx.borrow_and_update().clone() {
                            return Ok(value);
                        }
                        if rx.changed().await.is_err() {
                            // Leader dropped without publishing.
                            return Err(MarketDataError::InFlightAbandoned);
                        }
                    }
                };

                match tokio::time::timeout(self.wait_timeout, wait).await {
                    Ok(Ok(value)) => Ok(DedupResult {
                        value,
                        shared: true,
                    }),
                    Ok(Err(e)) => Err(e),
                    Err(_) => Err(MarketDataError::DedupTimeout {
                        seconds: self.wait_timeout.as_secs(),
                    }),
                }
            }
        }
    }

    /// Deduplicator counters.
    pub fn stats(&self) -> DedupStats {
        DedupStats {
            requests: self.requests.load(Ordering::Relaxed),
            deduplicated: self.deduplicated.load(Ordering::Relaxed),
            upstream_calls: self.upstream_calls.load(Ordering::Relaxed),
            in_flight: self.lock_registry().len(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Default for RequestDeduplicator<T> {
    fn default() -> Self {
        Self::new(DEFAULT_WAIT_TIMEOUT)
    }
}

enum Role<T> {
    Leader(watch::Sender<Option<T>>),
    Waiter(watch::Receiver<Option<T>>),
}

/// Removes the in-flight entry when the leader finishes, is cancelled,
/// or panics — the entry must never outlive the call that created it.
struct InFlightGuard<'a, T: Clone + Send + Sync + 'static> {
    dedup: &'a RequestDeduplicator<T>,
    key: &'a CacheKey,
}

impl<T: Clone + Send + Sync + 'static> Drop for InFlightGuard<'_, T> {
    fn drop(&mut self) {
        self.dedup.lock_registry().remove(self.key);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    use super::*;
    use crate::errors::ErrorKind;
    use crate::models::{DataType, FetchParams};

    fn key(symbol: &str) -> CacheKey {
        CacheKey {
            data_type: DataType::Quote,
            symbol: Arc::from(symbol),
            params: FetchParams::default(),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_identical_requests_collapse() {
        let dedup: Arc<RequestDeduplicator<u32>> = Arc::new(RequestDeduplicator::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let k = key("AAPL");

        let mut handles = Vec::new();
        for _ in 0..5 {
            let dedup = dedup.clone();
            let calls = calls.clone();
            let k = k.clone();
            handles.push(tokio::spawn(async move {
                dedup
                    .execute(&k, || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        42u32
                    })
                    .await
                    .unwrap()
            }));
        }

        let mut shared_count = 0;
        for handle in handles {
            let result = handle.await.unwrap();
            assert_eq!(result.value, 42);
            if result.shared {
                shared_count += 1;
            }
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1, "exactly one upstream call");
        assert_eq!(shared_count, 4);

        let stats = dedup.stats();
        assert_eq!(stats.requests, 5);
        assert_eq!(stats.deduplicated, 4);
        assert_eq!(stats.upstream_calls, 1);
        assert_eq!(stats.in_flight, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_distinct_keys_do_not_share() {
        let dedup: Arc<RequestDeduplicator<u32>> = Arc::new(RequestDeduplicator::default());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for symbol in ["AAPL", "MSFT"] {
            let dedup = dedup.clone();
            let calls = calls.clone();
            let k = key(symbol);
            handles.push(tokio::spawn(async move {
                dedup
                    .execute(&k, || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(30)).await;
                        1u32
                    })
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(dedup.stats().deduplicated, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_waiter_times_out_while_leader_continues() {
        let dedup: Arc<RequestDeduplicator<u32>> =
            Arc::new(RequestDeduplicator::new(Duration::from_millis(30)));
        let k = key("SLOW");

        let leader = {
            let dedup = dedup.clone();
            let k = k.clone();
            tokio::spawn(async move {
                dedup
                    .execute(&k, || async {
                        tokio::time::sleep(Duration::from_millis(150)).await;
                        7u32
                    })
                    .await
                    .unwrap()
            })
        };

        // Give the leader time to register.
        tokio::time::sleep(Duration::from_millis(20)).await;

        let err = dedup
            .execute(&k, || async { unreachable!("waiter must not fetch") })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DedupTimeout);

        // The leader is unaffected by the waiter's timeout.
        let result = leader.await.unwrap();
        assert_eq!(result.value, 7);
        assert!(!result.shared);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_abandoned_leader_releases_waiters() {
        let dedup: Arc<RequestDeduplicator<u32>> = Arc::new(RequestDeduplicator::default());
        let k = key("GONE");

        let leader = {
            let dedup = dedup.clone();
            let k = k.clone();
            tokio::spawn(async move {
                dedup
                    .execute(&k, || async {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                        0u32
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;

        let waiter = {
            let dedup = dedup.clone();
            let k = k.clone();
            tokio::spawn(async move { dedup.execute(&k, || async { 0u32 }).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        leader.abort();

        let err = waiter.await.unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InFlightAbandoned);

        // The registry entry must not outlive the aborted leader.
        assert_eq!(dedup.stats().in_flight, 0);
    }

    #[tokio::test]
    async fn test_sequential_requests_each_fetch() {
        let dedup: RequestDeduplicator<u32> = RequestDeduplicator::default();
        let k = key("SEQ");

        let first = dedup.execute(&k, || async { 1u32 }).await.unwrap();
        let second = dedup.execute(&k, || async { 2u32 }).await.unwrap();

        assert_eq!(first.value, 1);
        assert_eq!(second.value, 2);
        assert!(!first.shared);
        assert!(!second.shared);
        assert_eq!(dedup.stats().upstream_calls, 2);
    }
}
