//! In-memory shared store guarded by a Tokio mutex.
//!
//! Every operation runs inside one critical section, which gives the same
//! atomicity the Redis provider gets from `MULTI` and Lua scripts. Entries
//! expire lazily against the injected [`Clock`].

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use warden_core::clock::{Clock, SystemClock};
use warden_core::config::MemoryStoreConfig;
use warden_core::error::AppError;
use warden_core::result::AppResult;
use warden_core::traits::store::{SharedStore, StoreOp};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// In-memory store for single-node deployments and tests.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    /// Key → entry.
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    /// Time source for expiry.
    clock: Arc<dyn Clock>,
    /// Lowest purge threshold.
    max_entries: usize,
    /// Size that triggers the next purge: `max_entries`, or twice the live
    /// size left by the last purge when that is larger.
    purge_at: Arc<AtomicUsize>,
}

impl MemoryStore {
    /// Create a new in-memory store from configuration.
    pub fn new(config: &MemoryStoreConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            clock,
            max_entries: config.max_entries,
            purge_at: Arc::new(AtomicUsize::new(config.max_entries)),
        }
    }

    /// Create a store on the system clock with default limits.
    pub fn with_defaults() -> Self {
        Self::new(&MemoryStoreConfig::default(), Arc::new(SystemClock))
    }

    fn expiry(&self, ttl: Duration) -> AppResult<DateTime<Utc>> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| AppError::store(format!("TTL out of range: {e}")))?;
        Ok(self.clock.now() + ttl)
    }

    fn live<'a>(
        entries: &'a HashMap<String, Entry>,
        key: &str,
        now: DateTime<Utc>,
    ) -> Option<&'a Entry> {
        entries.get(key).filter(|e| e.is_live(now))
    }

    fn apply(&self, entries: &mut HashMap<String, Entry>, op: &StoreOp) -> AppResult<()> {
        match op {
            StoreOp::Set { key, value, ttl } => {
                let expires_at = Some(self.expiry(*ttl)?);
                entries.insert(
                    key.clone(),
                    Entry {
                        value: value.clone(),
                        expires_at,
                    },
                );
            }
            StoreOp::Delete { key } => {
                entries.remove(key);
            }
        }
        Ok(())
    }

    // Callers hold the entries lock, so the threshold needs no stronger ordering.
    fn purge_if_full(&self, entries: &mut HashMap<String, Entry>) {
        if entries.len() <= self.purge_at.load(Ordering::Relaxed) {
            return;
        }
        let now = self.clock.now();
        let before = entries.len();
        entries.retain(|_, e| e.is_live(now));
        let next = self.max_entries.max(entries.len().saturating_mul(2));
        self.purge_at.store(next, Ordering::Relaxed);
        debug!(
            removed = before - entries.len(),
            live = entries.len(),
            next_purge_at = next,
            "Purged expired entries"
        );
    }
}

#[async_trait]
impl SharedStore for MemoryStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let entries = self.entries.lock().await;
        Ok(Self::live(&entries, key, self.clock.now()).map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        let mut entries = self.entries.lock().await;
        self.apply(&mut entries, &StoreOp::set(key, value, ttl))?;
        self.purge_if_full(&mut entries);
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<bool> {
        let mut entries = self.entries.lock().await;
        let now = self.clock.now();
        Ok(entries.remove(key).is_some_and(|e| e.is_live(now)))
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let entries = self.entries.lock().await;
        Ok(Self::live(&entries, key, self.clock.now()).is_some())
    }

    async fn ttl(&self, key: &str) -> AppResult<Option<Duration>> {
        let entries = self.entries.lock().await;
        let now = self.clock.now();
        Ok(Self::live(&entries, key, now).map(|e| match e.expires_at {
            Some(at) => (at - now).to_std().unwrap_or_default(),
            None => Duration::MAX,
        }))
    }

    async fn incr_with_expiry(&self, key: &str, ttl: Duration) -> AppResult<i64> {
        let mut entries = self.entries.lock().await;
        let now = self.clock.now();

        let current = match Self::live(&entries, key, now) {
            Some(entry) => Some(
                entry
                    .value
                    .parse::<i64>()
                    .map_err(|_| AppError::store(format!("Value at '{key}' is not an integer")))?,
            ),
            None => None,
        };

        let count = current.unwrap_or(0) + 1;
        let expires_at = match entries.get(key).filter(|_| current.is_some()) {
            Some(Entry {
                expires_at: Some(at),
                ..
            }) => *at,
            _ => self.expiry(ttl)?,
        };

        entries.insert(
            key.to_string(),
            Entry {
                value: count.to_string(),
                expires_at: Some(expires_at),
            },
        );
        self.purge_if_full(&mut entries);
        Ok(count)
    }

    async fn transact(&self, ops: &[StoreOp]) -> AppResult<()> {
        let mut entries = self.entries.lock().await;
        // Validate every TTL before touching state so a failure leaves nothing applied.
        for op in ops {
            if let StoreOp::Set { ttl, .. } = op {
                self.expiry(*ttl)?;
            }
        }
        for op in ops {
            self.apply(&mut entries, op)?;
        }
        self.purge_if_full(&mut entries);
        Ok(())
    }

    async fn consume(&self, key: &str, then: &[StoreOp]) -> AppResult<Option<String>> {
        let mut entries = self.entries.lock().await;
        let now = self.clock.now();

        let Some(value) = Self::live(&entries, key, now).map(|e| e.value.clone()) else {
            return Ok(None);
        };

        let bound: Vec<StoreOp> = then.iter().map(|op| op.bind(&value)).collect();
        for op in &bound {
            if let StoreOp::Set { ttl, .. } = op {
                self.expiry(*ttl)?;
            }
        }

        entries.remove(key);
        for op in &bound {
            self.apply(&mut entries, op)?;
        }
        Ok(Some(value))
    }

    async fn scan_prefix(&self, prefix: &str) -> AppResult<Vec<String>> {
        let entries = self.entries.lock().await;
        let now = self.clock.now();
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(k, e)| k.starts_with(prefix) && e.is_live(now))
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::clock::ManualClock;
    use warden_core::traits::store::CONSUMED_VALUE;

    fn make_store() -> (MemoryStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
        let store = MemoryStore::new(&MemoryStoreConfig { max_entries: 1000 }, clock.clone());
        (store, clock)
    }

    #[tokio::test]
    async fn test_set_get_expire() {
        let (store, clock) = make_store();
        store
            .set("key1", "value1", Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(store.get("key1").await.unwrap(), Some("value1".to_string()));

        clock.advance(chrono::Duration::seconds(10));
        assert_eq!(store.get("key1").await.unwrap(), None);
        assert!(!store.exists("key1").await.unwrap());
    }

    #[tokio::test]
    async fn test_purge_threshold_backs_off_while_entries_live() {
        let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
        let store = MemoryStore::new(&MemoryStoreConfig { max_entries: 2 }, clock.clone());
        let ttl = Duration::from_secs(60);

        for key in ["a", "b", "c"] {
            store.set(key, "v", ttl).await.unwrap();
        }
        // Nothing had expired, so nothing was dropped and the next purge waits.
        assert_eq!(store.entries.lock().await.len(), 3);
        assert_eq!(store.purge_at.load(Ordering::Relaxed), 6);

        clock.advance(chrono::Duration::seconds(61));
        for key in ["d", "e", "f"] {
            store.set(key, "v", ttl).await.unwrap();
        }
        assert_eq!(store.entries.lock().await.len(), 6);

        store.set("g", "v", ttl).await.unwrap();
        assert_eq!(store.entries.lock().await.len(), 4);
        assert_eq!(store.purge_at.load(Ordering::Relaxed), 8);
        assert_eq!(store.get("a").await.unwrap(), None);
        assert_eq!(store.get("g").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_delete_reports_presence() {
        let (store, _) = make_store();
        store.set("k", "v", Duration::from_secs(60)).await.unwrap();
        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_incr_sets_expiry_once() {
        let (store, clock) = make_store();
        let ttl = Duration::from_secs(2);
        assert_eq!(store.incr_with_expiry("c", ttl).await.unwrap(), 1);

        clock.advance(chrono::Duration::seconds(1));
        assert_eq!(store.incr_with_expiry("c", ttl).await.unwrap(), 2);
        // Expiry was fixed by the first increment, not pushed out by the second.
        assert_eq!(store.ttl("c").await.unwrap(), Some(Duration::from_secs(1)));

        clock.advance(chrono::Duration::seconds(1));
        assert_eq!(store.incr_with_expiry("c", ttl).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_incr_rejects_non_integer() {
        let (store, _) = make_store();
        store.set("c", "abc", Duration::from_secs(5)).await.unwrap();
        assert!(store.incr_with_expiry("c", Duration::from_secs(5)).await.is_err());
    }

    #[tokio::test]
    async fn test_transact_applies_all() {
        let (store, _) = make_store();
        store.set("old", "x", Duration::from_secs(60)).await.unwrap();
        store
            .transact(&[
                StoreOp::set("a", "1", Duration::from_secs(60)),
                StoreOp::set("b", "2", Duration::from_secs(60)),
                StoreOp::delete("old"),
            ])
            .await
            .unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some("1".to_string()));
        assert_eq!(store.get("b").await.unwrap(), Some("2".to_string()));
        assert_eq!(store.get("old").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_consume_binds_value() {
        let (store, _) = make_store();
        store.set("t:1", "alice", Duration::from_secs(60)).await.unwrap();
        store
            .set("idx:alice:1", "1", Duration::from_secs(60))
            .await
            .unwrap();

        let then = [
            StoreOp::delete(format!("idx:{CONSUMED_VALUE}:1")),
            StoreOp::set("t:2", CONSUMED_VALUE, Duration::from_secs(60)),
        ];
        let consumed = store.consume("t:1", &then).await.unwrap();
        assert_eq!(consumed, Some("alice".to_string()));
        assert_eq!(store.get("t:1").await.unwrap(), None);
        assert_eq!(store.get("idx:alice:1").await.unwrap(), None);
        assert_eq!(store.get("t:2").await.unwrap(), Some("alice".to_string()));

        assert_eq!(store.consume("t:1", &then).await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_consume_single_winner_under_contention() {
        let (store, _) = make_store();
        store.set("once", "v", Duration::from_secs(60)).await.unwrap();

        let tasks = (0..16).map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.consume("once", &[]).await.unwrap() })
        });
        let results = futures::future::join_all(tasks).await;
        let winners = results
            .into_iter()
            .filter(|r| matches!(r, Ok(Some(_))))
            .count();
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_scan_prefix_skips_expired() {
        let (store, clock) = make_store();
        store.set("p:a", "1", Duration::from_secs(5)).await.unwrap();
        store.set("p:b", "1", Duration::from_secs(50)).await.unwrap();
        store.set("q:c", "1", Duration::from_secs(50)).await.unwrap();
        clock.advance(chrono::Duration::seconds(6));
        assert_eq!(store.scan_prefix("p:").await.unwrap(), vec!["p:b".to_string()]);
    }
}
