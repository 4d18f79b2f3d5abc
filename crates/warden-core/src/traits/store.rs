//! Shared atomic store trait used by the refresh store and the admission limiter.

use std::time::Duration;

use async_trait::async_trait;

use crate::result::AppResult;

/// Placeholder that [`SharedStore::consume`] substitutes with the consumed value
/// inside the keys and values of its follow-up operations.
pub const CONSUMED_VALUE: &str = "$value";

/// A single write inside an atomic store transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    /// Write `value` under `key`, expiring after `ttl`.
    Set {
        /// Target key.
        key: String,
        /// Value to store.
        value: String,
        /// Time to live.
        ttl: Duration,
    },
    /// Remove `key` if present.
    Delete {
        /// Target key.
        key: String,
    },
}

impl StoreOp {
    /// Builds a `Set` operation.
    pub fn set(key: impl Into<String>, value: impl Into<String>, ttl: Duration) -> Self {
        Self::Set {
            key: key.into(),
            value: value.into(),
            ttl,
        }
    }

    /// Builds a `Delete` operation.
    pub fn delete(key: impl Into<String>) -> Self {
        Self::Delete { key: key.into() }
    }

    /// Returns a copy with every [`CONSUMED_VALUE`] occurrence replaced by `value`.
    pub fn bind(&self, value: &str) -> Self {
        match self {
            Self::Set { key, value: v, ttl } => Self::Set {
                key: key.replace(CONSUMED_VALUE, value),
                value: v.replace(CONSUMED_VALUE, value),
                ttl: *ttl,
            },
            Self::Delete { key } => Self::Delete {
                key: key.replace(CONSUMED_VALUE, value),
            },
        }
    }
}

/// A key-value store with TTLs and atomic multi-key operations, shared by
/// every service instance.
///
/// Implementations must be safe for concurrent use from many tasks and many
/// processes. Every method is a single round trip to the backend.
#[async_trait]
pub trait SharedStore: Send + Sync + std::fmt::Debug + 'static {
    /// Get a value by key. Returns `None` if the key does not exist or has expired.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Set a value with a TTL.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()>;

    /// Delete a key. Returns `true` if it existed.
    async fn delete(&self, key: &str) -> AppResult<bool>;

    /// Check whether a key exists.
    async fn exists(&self, key: &str) -> AppResult<bool>;

    /// Remaining time to live of a key, `None` if the key is absent.
    async fn ttl(&self, key: &str) -> AppResult<Option<Duration>>;

    /// Increment a counter by 1 and return the new value.
    ///
    /// The first increment of a key sets its expiry to `ttl`; a counter found
    /// without an expiry is given one, so no counter outlives its window forever.
    async fn incr_with_expiry(&self, key: &str, ttl: Duration) -> AppResult<i64>;

    /// Apply all operations atomically: either every operation is visible or none.
    async fn transact(&self, ops: &[StoreOp]) -> AppResult<()>;

    /// Atomically read and delete `key`; if it held a value, apply `then` in the
    /// same atomic step (with [`CONSUMED_VALUE`] bound to that value) and return it.
    ///
    /// Of any number of concurrent callers consuming the same key, at most one
    /// receives `Some`.
    async fn consume(&self, key: &str, then: &[StoreOp]) -> AppResult<Option<String>>;

    /// List keys starting with `prefix` (without any backend key prefix).
    async fn scan_prefix(&self, prefix: &str) -> AppResult<Vec<String>>;

    /// Check that the backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}
