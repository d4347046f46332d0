//! Single-flight fetch cache for remote API documents
//!
//! Remote backends fetch the same handful of documents over and over: every
//! client instance, every process restart, and often several clients at the
//! same time. [`RequestCoalescingCache`] makes sure that:
//!
//! - a fresh entry (younger than the TTL) is served without touching the network,
//! - concurrent requests for the same uncached locator share one fetch,
//! - a waiter never blocks longer than the configured wait timeout; after
//!   that it fetches on its own.
//!
//! Entries are persisted as JSON in an injected [`CacheStore`] under
//! `RC#<sha256(locator)>`, so the store can outlive a single client.
//!
//! # Example
//!
//! ```rust,ignore
//! use restcfg_core::cache::{CacheConfig, RequestCoalescingCache};
//!
//! let cache = RequestCoalescingCache::with_config(CacheConfig::default());
//! let text = cache
//!     .fetch_or_cache("http://cfg/RestClient.yml", || async {
//!         reqwest::get("http://cfg/RestClient.yml").await?.text().await
//!     })
//!     .await?;
//! ```

use crate::error::Error;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Default time-to-live of a fetched document
pub const DEFAULT_TTL: Duration = Duration::from_secs(10);

/// Default bound on waiting for another caller's in-flight fetch
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(2);

const KEY_PREFIX: &str = "RC#";

/// Cache configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long a fetched document stays fresh
    pub ttl: Duration,
    /// How long a caller waits for someone else's fetch before fetching itself
    pub wait_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
        }
    }
}

/// Key-value storage backing the cache.
///
/// Implementations must be safe to share between tasks; the cache
/// serializes its own read-modify-write sequences.
pub trait CacheStore: Send + Sync {
    /// Read a raw entry
    fn get(&self, key: &str) -> Option<String>;
    /// Write a raw entry
    fn set(&self, key: &str, value: String);
    /// Delete an entry
    fn remove(&self, key: &str);
}

/// In-memory store whose lifetime is the session that owns it
#[derive(Debug, Default)]
pub struct SessionStore {
    entries: RwLock<HashMap<String, String>>,
}

impl SessionStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for SessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        if let Ok(mut guard) = self.entries.write() {
            guard.insert(key.to_string(), value);
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut guard) = self.entries.write() {
            guard.remove(key);
        }
    }
}

/// Source of wall-clock time in epoch milliseconds
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch
    fn now_millis(&self) -> i64;
}

/// System wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Manually advanced clock for deterministic expiry
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    /// Clock frozen at `now_millis`
    #[must_use]
    pub fn new(now_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(now_millis),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let millis = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Persisted state of one cached locator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// `data` holds a completed fetch
    pub available: bool,
    /// A fetch is in flight
    pub requesting: bool,
    /// Fetched document text
    pub data: String,
    /// Expiry in epoch milliseconds
    pub expires_at: i64,
}

enum Decision {
    Hit(String),
    Fetch,
    Wait(oneshot::Receiver<String>),
}

/// Per-locator single-flight cache with expiry
pub struct RequestCoalescingCache {
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
    /// Waiters per key. The lock also serializes entry read-modify-write.
    waiters: Mutex<HashMap<String, Vec<oneshot::Sender<String>>>>,
}

impl fmt::Debug for RequestCoalescingCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestCoalescingCache")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for RequestCoalescingCache {
    fn default() -> Self {
        Self::with_config(CacheConfig::default())
    }
}

impl RequestCoalescingCache {
    /// Create a cache over an explicit store and clock
    pub fn new(store: Arc<dyn CacheStore>, clock: Arc<dyn Clock>, config: CacheConfig) -> Self {
        Self {
            store,
            clock,
            config,
            waiters: Mutex::new(HashMap::new()),
        }
    }

    /// Session store and system clock
    #[must_use]
    pub fn with_config(config: CacheConfig) -> Self {
        Self::new(Arc::new(SessionStore::new()), Arc::new(SystemClock), config)
    }

    /// Current configuration
    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Storage key for a locator
    #[must_use]
    pub fn key_for(locator: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(locator.as_bytes());
        format!("{KEY_PREFIX}{}", hex::encode(hasher.finalize()))
    }

    /// Persisted entry for a locator, if any
    #[must_use]
    pub fn entry(&self, locator: &str) -> Option<CacheEntry> {
        let key = Self::key_for(locator);
        self.store
            .get(&key)
            .and_then(|raw| serde_json::from_str(&raw).ok())
    }

    /// Drop the persisted entry for a locator
    pub fn invalidate(&self, locator: &str) {
        let _guard = self.lock_waiters();
        self.store.remove(&Self::key_for(locator));
    }

    /// Return fresh cached data for `locator`, or fetch it.
    ///
    /// `fetch` runs at most once per call, and concurrent calls for the same
    /// locator share a single in-flight fetch unless the wait times out.
    pub async fn fetch_or_cache<F, Fut, E>(&self, locator: &str, fetch: F) -> Result<String, E>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<String, E>>,
        E: fmt::Display,
    {
        let key = Self::key_for(locator);

        match self.decide(&key) {
            Decision::Hit(data) => {
                debug!(locator = %locator, "Cache hit");
                Ok(data)
            }
            Decision::Fetch => {
                debug!(locator = %locator, "Cache miss, fetching");
                self.fetch_and_complete(&key, locator, &fetch).await
            }
            Decision::Wait(rx) => {
                debug!(locator = %locator, "Fetch in flight, waiting");
                match tokio::time::timeout(self.config.wait_timeout, rx).await {
                    Ok(Ok(data)) => Ok(data),
                    Ok(Err(_)) => {
                        debug!(locator = %locator, "In-flight fetch failed, fetching directly");
                        self.fetch_and_complete(&key, locator, &fetch).await
                    }
                    Err(_) => {
                        warn!(
                            locator = %locator,
                            timeout_ms = self.config.wait_timeout.as_millis(),
                            "Timed out waiting for in-flight fetch, fetching directly"
                        );
                        self.fetch_and_complete(&key, locator, &fetch).await
                    }
                }
            }
        }
    }

    fn decide(&self, key: &str) -> Decision {
        let mut waiters = self.lock_waiters();
        let entry = self.read_entry(key);

        if entry.available && self.clock.now_millis() < entry.expires_at {
            return Decision::Hit(entry.data);
        }

        if !entry.requesting {
            let in_flight = CacheEntry {
                available: false,
                requesting: true,
                data: String::new(),
                expires_at: 0,
            };
            self.write_entry(key, &in_flight);
            return Decision::Fetch;
        }

        let (tx, rx) = oneshot::channel();
        waiters.entry(key.to_string()).or_default().push(tx);
        Decision::Wait(rx)
    }

    async fn fetch_and_complete<F, Fut, E>(&self, key: &str, locator: &str, fetch: &F) -> Result<String, E>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<String, E>>,
        E: fmt::Display,
    {
        match fetch().await {
            Ok(data) => {
                self.complete(key, &data);
                Ok(data)
            }
            Err(e) => {
                warn!(locator = %locator, error = %e, "Fetch failed");
                self.abandon(key);
                Err(e)
            }
        }
    }

    fn complete(&self, key: &str, data: &str) {
        let mut waiters = self.lock_waiters();
        let ttl_millis = i64::try_from(self.config.ttl.as_millis()).unwrap_or(i64::MAX);
        let entry = CacheEntry {
            available: true,
            requesting: false,
            data: data.to_string(),
            expires_at: self.clock.now_millis().saturating_add(ttl_millis),
        };
        self.write_entry(key, &entry);

        if let Some(pending) = waiters.remove(key) {
            debug!(key = %key, waiters = pending.len(), "Cache updated, notifying waiters");
            for tx in pending {
                let _ = tx.send(data.to_string());
            }
        }
    }

    fn abandon(&self, key: &str) {
        let mut waiters = self.lock_waiters();
        let mut entry = self.read_entry(key);
        entry.requesting = false;
        self.write_entry(key, &entry);
        // Dropping the senders releases every waiter to fetch on its own
        waiters.remove(key);
    }

    fn read_entry(&self, key: &str) -> CacheEntry {
        let Some(raw) = self.store.get(key) else {
            return CacheEntry::default();
        };
        match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                let err = Error::cache_corrupted(key, e);
                warn!(error = %err, "Discarding corrupted cache entry");
                CacheEntry::default()
            }
        }
    }

    fn write_entry(&self, key: &str, entry: &CacheEntry) {
        match serde_json::to_string(entry) {
            Ok(raw) => self.store.set(key, raw),
            Err(e) => warn!(key = %key, error = %e, "Failed to persist cache entry"),
        }
    }

    fn lock_waiters(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<oneshot::Sender<String>>>> {
        self.waiters
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    const LOCATOR: &str = "http://127.0.0.1:8080/cfg/RestClient.yml";

    fn manual_cache() -> (RequestCoalescingCache, Arc<ManualClock>, Arc<SessionStore>) {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let store = Arc::new(SessionStore::new());
        let cache = RequestCoalescingCache::new(store.clone(), clock.clone(), CacheConfig::default());
        (cache, clock, store)
    }

    fn counting_fetch(
        calls: &Arc<AtomicUsize>,
        body: &'static str,
    ) -> impl Fn() -> std::future::Ready<Result<String, String>> {
        let calls = Arc::clone(calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(body.to_string()))
        }
    }

    #[test]
    fn test_key_is_stable_and_prefixed() {
        let a = RequestCoalescingCache::key_for(LOCATOR);
        let b = RequestCoalescingCache::key_for(LOCATOR);
        let c = RequestCoalescingCache::key_for("http://127.0.0.1:8080/cfg/RestClientB.yml");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("RC#"));
        assert_eq!(a.len(), 3 + 64);
    }

    #[tokio::test]
    async fn test_hit_within_ttl_then_refetch_after_expiry() {
        let (cache, clock, _store) = manual_cache();
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch = counting_fetch(&calls, "example: {}");

        assert_eq!(cache.fetch_or_cache(LOCATOR, &fetch).await.unwrap(), "example: {}");
        clock.advance(Duration::from_secs(5));
        assert_eq!(cache.fetch_or_cache(LOCATOR, &fetch).await.unwrap(), "example: {}");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        clock.advance(Duration::from_secs(6));
        cache.fetch_or_cache(LOCATOR, &fetch).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        cache.fetch_or_cache(LOCATOR, &fetch).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_entry_is_persisted_as_json() {
        let (cache, clock, store) = manual_cache();
        let calls = Arc::new(AtomicUsize::new(0));
        let start = clock.now_millis();

        cache
            .fetch_or_cache(LOCATOR, counting_fetch(&calls, "a: b"))
            .await
            .unwrap();

        let raw = store.get(&RequestCoalescingCache::key_for(LOCATOR)).unwrap();
        assert!(raw.contains("\"expiresAt\""));
        let entry = cache.entry(LOCATOR).unwrap();
        assert!(entry.available);
        assert!(!entry.requesting);
        assert_eq!(entry.data, "a: b");
        assert_eq!(entry.expires_at, start + 10_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_requests_share_one_fetch() {
        let cache = RequestCoalescingCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch = || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok::<_, String>("shared".to_string())
            }
        };

        let (a, b) = tokio::join!(
            cache.fetch_or_cache(LOCATOR, fetch),
            cache.fetch_or_cache(LOCATOR, fetch)
        );

        assert_eq!(a.unwrap(), "shared");
        assert_eq!(b.unwrap(), "shared");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.lock_waiters().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiter_times_out_and_fetches_directly() {
        let cache = RequestCoalescingCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch = || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok::<_, String>("slow".to_string())
                } else {
                    Ok("fresh".to_string())
                }
            }
        };

        let started = tokio::time::Instant::now();
        let (slow, fast) = tokio::join!(
            cache.fetch_or_cache(LOCATOR, fetch),
            async {
                let result = cache.fetch_or_cache(LOCATOR, fetch).await;
                (result, started.elapsed())
            }
        );

        let (fast, waited) = fast;
        assert_eq!(fast.unwrap(), "fresh");
        assert!(waited >= DEFAULT_WAIT_TIMEOUT);
        assert!(waited < Duration::from_secs(60));
        assert_eq!(slow.unwrap(), "slow");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fetch_releases_waiters() {
        let cache = RequestCoalescingCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch = || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                if n == 0 {
                    Err("connection refused".to_string())
                } else {
                    Ok("recovered".to_string())
                }
            }
        };

        let started = tokio::time::Instant::now();
        let (first, second) = tokio::join!(
            cache.fetch_or_cache(LOCATOR, fetch),
            cache.fetch_or_cache(LOCATOR, fetch)
        );

        assert_eq!(first.unwrap_err(), "connection refused");
        assert_eq!(second.unwrap(), "recovered");
        assert!(started.elapsed() < DEFAULT_WAIT_TIMEOUT);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_clears_in_flight_mark() {
        let (cache, _clock, _store) = manual_cache();

        let failed = cache
            .fetch_or_cache(LOCATOR, || async { Err::<String, _>("boom") })
            .await;
        assert!(failed.is_err());

        let entry = cache.entry(LOCATOR).unwrap();
        assert!(!entry.requesting);
        assert!(!entry.available);

        let calls = Arc::new(AtomicUsize::new(0));
        cache
            .fetch_or_cache(LOCATOR, counting_fetch(&calls, "ok"))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_corrupted_entry_is_refetched() {
        let (cache, _clock, store) = manual_cache();
        store.set(&RequestCoalescingCache::key_for(LOCATOR), "{not json".to_string());

        let calls = Arc::new(AtomicUsize::new(0));
        let data = cache
            .fetch_or_cache(LOCATOR, counting_fetch(&calls, "fixed"))
            .await
            .unwrap();

        assert_eq!(data, "fixed");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let (cache, _clock, _store) = manual_cache();
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch = counting_fetch(&calls, "v");

        cache.fetch_or_cache(LOCATOR, &fetch).await.unwrap();
        cache.invalidate(LOCATOR);
        cache.fetch_or_cache(LOCATOR, &fetch).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
