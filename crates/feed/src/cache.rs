//! Time-bounded cache of fetched chain snapshots.
//!
//! Keyed by upper-cased symbol. Entries older than the TTL are treated as
//! absent and overwritten on the next insert. Each symbol also has a fill
//! lock so concurrent misses trigger a single fetch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use options_screener_core::CacheConfig;
use parking_lot::{Mutex, RwLock};
use tokio::time::Instant;

use crate::fetcher::ChainSnapshot;

#[derive(Debug)]
struct CacheEntry {
    stored_at: Instant,
    snapshot: Arc<ChainSnapshot>,
}

/// Thread-safe snapshot cache shared across concurrent fetches.
#[derive(Debug)]
pub struct SnapshotCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
    fills: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl SnapshotCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
            fills: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.ttl())
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the snapshot for `symbol` if one was stored within the TTL.
    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<Arc<ChainSnapshot>> {
        let entries = self.entries.read();
        entries
            .get(&key(symbol))
            .filter(|entry| entry.stored_at.elapsed() < self.ttl)
            .map(|entry| Arc::clone(&entry.snapshot))
    }

    /// Stores `snapshot` under its symbol, replacing any previous entry.
    pub fn insert(&self, snapshot: ChainSnapshot) -> Arc<ChainSnapshot> {
        let snapshot = Arc::new(snapshot);
        self.entries.write().insert(
            key(&snapshot.symbol),
            CacheEntry {
                stored_at: Instant::now(),
                snapshot: Arc::clone(&snapshot),
            },
        );
        snapshot
    }

    /// Lock held while a snapshot for `symbol` is being fetched.
    pub(crate) fn fill_lock(&self, symbol: &str) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(self.fills.lock().entry(key(symbol)).or_default())
    }

    /// Drops the entry for `symbol`. Returns whether one existed.
    pub fn invalidate(&self, symbol: &str) -> bool {
        self.entries.write().remove(&key(symbol)).is_some()
    }

    /// Removes expired entries and returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.stored_at.elapsed() < self.ttl);
        before - entries.len()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Number of stored entries, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

fn key(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::FetchSource;
    use chrono::NaiveDate;

    fn snapshot(symbol: &str) -> ChainSnapshot {
        ChainSnapshot {
            symbol: symbol.to_string(),
            as_of: NaiveDate::from_ymd_opt(2025, 11, 4).unwrap(),
            source: FetchSource::Empty,
            records: Vec::new(),
            notices: Vec::new(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let cache = SnapshotCache::new(Duration::from_secs(30));
        cache.insert(snapshot("AAPL"));

        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(cache.get("AAPL").is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get("AAPL").is_none());
        assert_eq!(cache.len(), 1);

        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_case_insensitive() {
        let cache = SnapshotCache::new(Duration::from_secs(30));
        cache.insert(snapshot("spy"));

        assert!(cache.get("SPY").is_some());
        assert!(cache.get(" spy ").is_some());
        assert!(cache.invalidate("Spy"));
        assert!(!cache.invalidate("SPY"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_insert_replaces_and_refreshes() {
        let cache = SnapshotCache::new(Duration::from_secs(30));
        cache.insert(snapshot("AAPL"));
        tokio::time::advance(Duration::from_secs(20)).await;

        let mut fresh = snapshot("AAPL");
        fresh.source = FetchSource::Live;
        cache.insert(fresh);
        tokio::time::advance(Duration::from_secs(20)).await;

        let hit = cache.get("AAPL").unwrap();
        assert_eq!(hit.source, FetchSource::Live);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_fill_lock_is_shared_per_symbol() {
        let cache = SnapshotCache::new(Duration::from_secs(30));
        let held = cache.fill_lock("aapl");
        let _guard = held.lock().await;

        assert!(cache.fill_lock(" AAPL ").try_lock().is_err());
        assert!(cache.fill_lock("MSFT").try_lock().is_ok());
    }

    #[test]
    fn test_from_config_uses_ttl() {
        let cache = SnapshotCache::from_config(&CacheConfig { ttl_secs: 5 });
        assert_eq!(cache.ttl(), Duration::from_secs(5));

        cache.insert(snapshot("QQQ"));
        cache.clear();
        assert!(cache.is_empty());
    }
}
