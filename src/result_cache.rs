// Short-lived cache for remote list fetches, persisted through the key-value store

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::persistence::{KeyValueStore, PersistenceError};

pub const DEFAULT_TTL_SECONDS: i64 = 300;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedList<T> {
    pub data: T,
    pub timestamp: DateTime<Utc>,
}

impl<T> CachedList<T> {
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.timestamp < ttl
    }
}

#[derive(Debug, Default)]
pub struct CacheStats {
    pub hit_count: AtomicUsize,
    pub miss_count: AtomicUsize,
    pub expired_count: AtomicUsize,
    pub fetch_count: AtomicUsize,
    pub fetch_failure_count: AtomicUsize,
    pub storage_error_count: AtomicUsize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStatsReport {
    pub hit_count: usize,
    pub miss_count: usize,
    pub expired_count: usize,
    pub fetch_count: usize,
    pub fetch_failure_count: usize,
    pub storage_error_count: usize,
}

/// TTL cache of whole lists keyed by a per-user key.
///
/// Entries live in the key-value store as `{data, timestamp}` JSON. Storage
/// failures degrade to a miss on read and a no-op on write; they never fail
/// the caller.
pub struct ResultCache<T> {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    stats: CacheStats,
    _data: PhantomData<fn() -> T>,
}

impl<T> ResultCache<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            store,
            clock,
            ttl,
            stats: CacheStats::default(),
            _data: PhantomData,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    async fn read_entry(&self, key: &str) -> Option<CachedList<T>> {
        let raw = match self.store.get(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                self.record_storage_error(key, &e);
                return None;
            }
        };
        match serde_json::from_str::<CachedList<T>>(&raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                self.record_storage_error(key, &PersistenceError::Serialization(e));
                None
            }
        }
    }

    fn record_storage_error(&self, key: &str, error: &PersistenceError) {
        warn!("Result cache storage failure for {}: {}", key, error);
        self.stats.storage_error_count.fetch_add(1, Ordering::SeqCst);
    }

    pub async fn get(&self, key: &str) -> Option<T> {
        match self.read_entry(key).await {
            Some(entry) if entry.is_fresh(self.clock.now(), self.ttl) => {
                debug!("Result cache hit for {}", key);
                self.stats.hit_count.fetch_add(1, Ordering::SeqCst);
                Some(entry.data)
            }
            Some(_) => {
                debug!("Result cache entry for {} expired", key);
                self.stats.expired_count.fetch_add(1, Ordering::SeqCst);
                self.stats.miss_count.fetch_add(1, Ordering::SeqCst);
                None
            }
            None => {
                self.stats.miss_count.fetch_add(1, Ordering::SeqCst);
                None
            }
        }
    }

    pub async fn set(&self, key: &str, value: T) {
        let entry = CachedList {
            data: value,
            timestamp: self.clock.now(),
        };
        let serialized = match serde_json::to_string(&entry) {
            Ok(serialized) => serialized,
            Err(e) => {
                self.record_storage_error(key, &PersistenceError::Serialization(e));
                return;
            }
        };
        if let Err(e) = self.store.set(key, serialized).await {
            self.record_storage_error(key, &e);
        }
    }

    pub async fn invalidate(&self, key: &str) {
        if let Err(e) = self.store.remove(key).await {
            self.record_storage_error(key, &e);
        }
    }

    /// Return the cached value for `key` or run `fetcher` to refresh it.
    ///
    /// A failed fetch leaves any previous entry in place.
    pub async fn fetch_with_cache<F, Fut, E>(
        &self,
        key: &str,
        force_refresh: bool,
        fetcher: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !force_refresh {
            if let Some(cached) = self.get(key).await {
                return Ok(cached);
            }
        }

        self.stats.fetch_count.fetch_add(1, Ordering::SeqCst);
        match fetcher().await {
            Ok(value) => {
                self.set(key, value.clone()).await;
                Ok(value)
            }
            Err(e) => {
                self.stats.fetch_failure_count.fetch_add(1, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    pub fn stats(&self) -> CacheStatsReport {
        CacheStatsReport {
            hit_count: self.stats.hit_count.load(Ordering::SeqCst),
            miss_count: self.stats.miss_count.load(Ordering::SeqCst),
            expired_count: self.stats.expired_count.load(Ordering::SeqCst),
            fetch_count: self.stats.fetch_count.load(Ordering::SeqCst),
            fetch_failure_count: self.stats.fetch_failure_count.load(Ordering::SeqCst),
            storage_error_count: self.stats.storage_error_count.load(Ordering::SeqCst),
        }
    }
}
