//! Bounded in-memory cache with per-entry TTL and LRU eviction.
//!
//! One flat map keyed by [`CacheKey`], guarded by a single mutex. The
//! critical sections are pure map operations; TTL expiry is checked
//! lazily on read and LRU eviction runs on write-when-full, so neither
//! needs a background task. The cache is TTL-policy-agnostic: the
//! caller supplies the TTL (chosen per [`DataType`](crate::models::DataType))
//! at insert time.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{debug, warn};
use serde::Serialize;

use crate::models::{CacheKey, DataPayload};

/// Default maximum number of live entries.
const DEFAULT_CAPACITY: usize = 1000;

/// One cached value and its bookkeeping.
struct CacheSlot {
    value: std::sync::Arc<DataPayload>,
    cached_at: Instant,
    ttl: Duration,
    /// Adapter that produced the value
    source: &'static str,
    /// Recency stamp for LRU; bumped on every read and write
    last_access: u64,
}

struct CacheInner {
    map: HashMap<CacheKey, CacheSlot>,
    /// Monotonic access counter backing `last_access`
    tick: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

/// Cache counters and occupancy.
#[derive(Clone, Debug, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    /// hits / (hits + misses); 0.0 before any lookup
    pub hit_rate: f64,
}

/// A successful cache lookup.
#[derive(Clone, Debug)]
pub struct CacheHit {
    pub value: std::sync::Arc<DataPayload>,
    /// Adapter that originally produced the value
    pub source: &'static str,
}

/// Thread-safe bounded LRU cache with lazy TTL expiry.
pub struct DataCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
}

impl DataCache {
    /// Create a cache with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a cache bounded to `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                map: HashMap::new(),
                tick: 0,
                hits: 0,
                misses: 0,
                evictions: 0,
                expirations: 0,
            }),
            capacity: capacity.max(1),
        }
    }

    /// Lock the cache, recovering from poison if necessary.
    ///
    /// A possibly stale cache beats panicking the request path; a bad
    /// entry ages out through its TTL anyway.
    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            warn!("Cache mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Look up a key, treating an entry past its TTL as a miss.
    pub fn get(&self, key: &CacheKey) -> Option<CacheHit> {
        enum Lookup {
            Miss,
            Hit(CacheHit),
            Expired,
        }

        let mut inner = self.lock();
        inner.tick += 1;
        let tick = inner.tick;

        let lookup = match inner.map.get_mut(key) {
            None => Lookup::Miss,
            Some(slot) => {
                if slot.cached_at.elapsed() < slot.ttl {
                    slot.last_access = tick;
                    Lookup::Hit(CacheHit {
                        value: slot.value.clone(),
                        source: slot.source,
                    })
                } else {
                    Lookup::Expired
                }
            }
        };

        match lookup {
            Lookup::Miss => {
                inner.misses += 1;
                None
            }
            Lookup::Hit(hit) => {
                inner.hits += 1;
                Some(hit)
            }
            Lookup::Expired => {
                inner.map.remove(key);
                inner.expirations += 1;
                inner.misses += 1;
                debug!("Cache entry expired: {}", key);
                None
            }
        }
    }

    /// Insert or refresh an entry.
    ///
    /// A key always maps to at most one live entry: inserting an
    /// existing key overwrites it in place. When a new key would exceed
    /// capacity, the least recently accessed entry is evicted first.
    pub fn insert(
        &self,
        key: CacheKey,
        value: std::sync::Arc<DataPayload>,
        ttl: Duration,
        source: &'static str,
    ) {
        let mut inner = self.lock();
        inner.tick += 1;
        let tick = inner.tick;

        if !inner.map.contains_key(&key) && inner.map.len() >= self.capacity {
            if let Some(lru_key) = inner
                .map
                .iter()
                .min_by_key(|(_, slot)| slot.last_access)
                .map(|(k, _)| k.clone())
            {
                inner.map.remove(&lru_key);
                inner.evictions += 1;
                debug!("Cache evicted LRU entry: {}", lru_key);
            }
        }

        inner.map.insert(
            key,
            CacheSlot {
                value,
                cached_at: Instant::now(),
                ttl,
                source,
                last_access: tick,
            },
        );
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all entries, keeping the counters.
    pub fn clear(&self) {
        self.lock().map.clear();
    }

    /// Counters and occupancy.
    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        let lookups = inner.hits + inner.misses;
        CacheStats {
            entries: inner.map.len(),
            capacity: self.capacity,
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
            expirations: inner.expirations,
            hit_rate: if lookups == 0 {
                0.0
            } else {
                inner.hits as f64 / lookups as f64
            },
        }
    }
}

impl Default for DataCache {
    fn default() -> Self {
        Self::new()
    }
}
