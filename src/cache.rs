// In-memory, time-boxed cache for repository listings.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::github::RepoEntry;

/// How long a fetched listing stays valid.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

/// Identifies one remote path inside one repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub owner: String,
    pub repo: String,
    pub path: String,
}

impl CacheKey {
    pub fn new(owner: &str, repo: &str, path: &str) -> Self {
        Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            path: path.to_string(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}/{}", self.owner, self.repo)
        } else {
            write!(f, "{}/{}:{}", self.owner, self.repo, self.path)
        }
    }
}

#[derive(Debug, Clone)]
struct CacheRecord {
    payload: Vec<RepoEntry>,
    fetched_at: Instant,
}

/// Thread-safe listing cache with lazy expiry.
///
/// Expired records stay in the map until the key is fetched again; a lookup
/// simply treats them as absent. Alongside the records the cache keeps one
/// async lock per key so that concurrent misses for the same path share a
/// single upstream call (see [`ContentCache::flight_guard`]).
#[derive(Debug, Clone)]
pub struct ContentCache {
    ttl: Duration,
    records: Arc<Mutex<HashMap<CacheKey, CacheRecord>>>,
    flights: Arc<Mutex<HashMap<CacheKey, Arc<AsyncMutex<()>>>>>,
}

impl ContentCache {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            records: Arc::new(Mutex::new(HashMap::new())),
            flights: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached listing for `key` if it is still fresh.
    pub fn get(&self, key: &CacheKey) -> Option<Vec<RepoEntry>> {
        self.get_at(key, Instant::now())
    }

    pub(crate) fn get_at(&self, key: &CacheKey, now: Instant) -> Option<Vec<RepoEntry>> {
        let records = self.records.lock().unwrap();
        records
            .get(key)
            .filter(|record| now.duration_since(record.fetched_at) < self.ttl)
            .map(|record| record.payload.clone())
    }

    /// Store a listing, replacing whatever was there before.
    pub fn insert(&self, key: CacheKey, payload: Vec<RepoEntry>) {
        self.insert_at(key, payload, Instant::now());
    }

    pub(crate) fn insert_at(&self, key: CacheKey, payload: Vec<RepoEntry>, fetched_at: Instant) {
        let mut records = self.records.lock().unwrap();
        records.insert(
            key,
            CacheRecord {
                payload,
                fetched_at,
            },
        );
    }

    /// Number of stored records, expired ones included.
    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait for exclusive rights to fetch `key` from upstream.
    ///
    /// Callers re-check the cache after acquiring the guard: if another task
    /// filled it in the meantime there is nothing left to fetch.
    pub async fn flight_guard(&self, key: &CacheKey) -> FlightGuard {
        let lock = {
            let mut flights = self.flights.lock().unwrap();
            flights
                .entry(key.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        FlightGuard {
            key: key.clone(),
            flights: Arc::clone(&self.flights),
            _guard: lock.lock_owned().await,
        }
    }

    /// Number of keys with a fetch in progress or queued.
    pub fn in_flight(&self) -> usize {
        self.flights.lock().unwrap().len()
    }
}

/// Held while fetching one key. Dropping the last holder forgets the key's lock.
pub struct FlightGuard {
    key: CacheKey,
    flights: Arc<Mutex<HashMap<CacheKey, Arc<AsyncMutex<()>>>>>,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        let Ok(mut flights) = self.flights.lock() else {
            return;
        };
        // One reference in the map, one in our guard; anything more is a waiter
        let idle = flights
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) <= 2);
        if idle {
            flights.remove(&self.key);
        }
    }
}

impl Default for ContentCache {
    fn default() -> Self {
        Self::new()
    }
}
