//! Store manager that dispatches to the configured provider.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use warden_core::clock::Clock;
use warden_core::config::StoreConfig;
use warden_core::error::AppError;
use warden_core::result::AppResult;
use warden_core::traits::store::{SharedStore, StoreOp};

/// Wraps the shared store selected by configuration.
#[derive(Debug, Clone)]
pub struct StoreManager {
    inner: Arc<dyn SharedStore>,
}

impl StoreManager {
    /// Create a store manager from configuration.
    ///
    /// The clock drives expiry for the in-memory provider; Redis keeps its own time.
    pub async fn new(config: &StoreConfig, clock: Arc<dyn Clock>) -> AppResult<Self> {
        let inner: Arc<dyn SharedStore> = match config.provider.as_str() {
            #[cfg(feature = "redis-backend")]
            "redis" => {
                info!("Initializing Redis shared store");
                let client = crate::redis::RedisClient::connect(&config.redis).await?;
                Arc::new(crate::redis::RedisStore::new(client))
            }
            #[cfg(feature = "memory")]
            "memory" => {
                info!(
                    max_entries = config.memory.max_entries,
                    "Initializing in-memory shared store"
                );
                Arc::new(crate::memory::MemoryStore::new(&config.memory, clock))
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown store provider: '{other}'. Supported: memory, redis"
                )));
            }
        };

        Ok(Self { inner })
    }

    /// Create a store manager from an existing store (for testing).
    pub fn from_store(store: Arc<dyn SharedStore>) -> Self {
        Self { inner: store }
    }

    /// Get a reference to the inner store.
    pub fn store(&self) -> &dyn SharedStore {
        self.inner.as_ref()
    }
}

#[async_trait]
impl SharedStore for StoreManager {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> AppResult<bool> {
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        self.inner.exists(key).await
    }

    async fn ttl(&self, key: &str) -> AppResult<Option<Duration>> {
        self.inner.ttl(key).await
    }

    async fn incr_with_expiry(&self, key: &str, ttl: Duration) -> AppResult<i64> {
        self.inner.incr_with_expiry(key, ttl).await
    }

    async fn transact(&self, ops: &[StoreOp]) -> AppResult<()> {
        self.inner.transact(ops).await
    }

    async fn consume(&self, key: &str, then: &[StoreOp]) -> AppResult<Option<String>> {
        self.inner.consume(key, then).await
    }

    async fn scan_prefix(&self, prefix: &str) -> AppResult<Vec<String>> {
        self.inner.scan_prefix(prefix).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::clock::SystemClock;

    #[tokio::test]
    async fn test_unknown_provider_rejected() {
        let config = StoreConfig {
            provider: "etcd".to_string(),
            ..StoreConfig::default()
        };
        let err = StoreManager::new(&config, Arc::new(SystemClock))
            .await
            .unwrap_err();
        assert_eq!(err.kind, warden_core::error::ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_memory_provider_round_trip() {
        let manager = StoreManager::new(&StoreConfig::default(), Arc::new(SystemClock))
            .await
            .unwrap();
        manager.set("k", "v", Duration::from_secs(30)).await.unwrap();
        assert_eq!(manager.get("k").await.unwrap(), Some("v".to_string()));
        assert!(manager.health_check().await.unwrap());
    }
}
