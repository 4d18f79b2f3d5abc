//! Shared helpers for the warden-auth integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use warden_auth::{UserDirectory, UserRecord};
use warden_cache::memory::MemoryStore;
use warden_core::clock::ManualClock;
use warden_core::config::{MemoryStoreConfig, SigningAlgorithm, TokenConfig};
use warden_core::error::AppError;
use warden_core::result::AppResult;
use warden_core::traits::store::{SharedStore, StoreOp};

pub const START: i64 = 1_800_000_000;

pub fn fixture(rel: &str) -> String {
    format!("{}/tests/fixtures/{rel}", env!("CARGO_MANIFEST_DIR"))
}

pub fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::at_unix(START))
}

pub fn memory_store(clock: Arc<ManualClock>) -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new(&MemoryStoreConfig::default(), clock))
}

pub fn rsa_config(kid: &str, key: &str, public_dir: &str) -> TokenConfig {
    TokenConfig {
        algorithm: SigningAlgorithm::Rs256,
        kid: kid.to_string(),
        private_key_path: fixture(key),
        public_keys_dir: fixture(public_dir),
        ..TokenConfig::default()
    }
}

pub fn eddsa_config(kid: &str, key: &str, public_dir: &str) -> TokenConfig {
    TokenConfig {
        algorithm: SigningAlgorithm::EdDsa,
        ..rsa_config(kid, key, public_dir)
    }
}

pub fn hmac_config(secret: &str) -> TokenConfig {
    TokenConfig {
        algorithm: SigningAlgorithm::Hs256,
        secret: secret.to_string(),
        ..TokenConfig::default()
    }
}

/// Users keyed by e-mail with plain-text passwords.
#[derive(Debug, Default)]
pub struct StaticUsers {
    users: HashMap<String, (UserRecord, String)>,
}

impl StaticUsers {
    pub fn with(mut self, id: &str, email: &str, role: &str, password: &str) -> Self {
        let record = UserRecord {
            id: id.to_string(),
            email: email.to_string(),
            role: role.to_string(),
            active: true,
        };
        self.users
            .insert(email.to_string(), (record, password.to_string()));
        self
    }
}

#[async_trait]
impl UserDirectory for StaticUsers {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
        Ok(self.users.get(email).map(|(u, _)| u.clone()))
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<UserRecord>> {
        Ok(self
            .users
            .values()
            .find(|(u, _)| u.id == id)
            .map(|(u, _)| u.clone()))
    }

    async fn verify_password(&self, user: &UserRecord, password: &str) -> AppResult<bool> {
        Ok(self
            .users
            .get(&user.email)
            .is_some_and(|(_, pw)| pw == password))
    }
}

/// A store whose every call fails.
#[derive(Debug, Default)]
pub struct FailingStore;

#[async_trait]
impl SharedStore for FailingStore {
    async fn get(&self, _key: &str) -> AppResult<Option<String>> {
        Err(AppError::store("connection refused"))
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> AppResult<()> {
        Err(AppError::store("connection refused"))
    }

    async fn delete(&self, _key: &str) -> AppResult<bool> {
        Err(AppError::store("connection refused"))
    }

    async fn exists(&self, _key: &str) -> AppResult<bool> {
        Err(AppError::store("connection refused"))
    }

    async fn ttl(&self, _key: &str) -> AppResult<Option<Duration>> {
        Err(AppError::store("connection refused"))
    }

    async fn incr_with_expiry(&self, _key: &str, _ttl: Duration) -> AppResult<i64> {
        Err(AppError::store("connection refused"))
    }

    async fn transact(&self, _ops: &[StoreOp]) -> AppResult<()> {
        Err(AppError::store("connection refused"))
    }

    async fn consume(&self, _key: &str, _then: &[StoreOp]) -> AppResult<Option<String>> {
        Err(AppError::store("connection refused"))
    }

    async fn scan_prefix(&self, _prefix: &str) -> AppResult<Vec<String>> {
        Err(AppError::store("connection refused"))
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(false)
    }
}

/// A store whose counter never answers within any sensible timeout.
#[derive(Debug, Default)]
pub struct StalledStore;

#[async_trait]
impl SharedStore for StalledStore {
    async fn get(&self, _key: &str) -> AppResult<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> AppResult<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> AppResult<bool> {
        Ok(false)
    }

    async fn exists(&self, _key: &str) -> AppResult<bool> {
        Ok(false)
    }

    async fn ttl(&self, _key: &str) -> AppResult<Option<Duration>> {
        Ok(None)
    }

    async fn incr_with_expiry(&self, _key: &str, _ttl: Duration) -> AppResult<i64> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(1)
    }

    async fn transact(&self, _ops: &[StoreOp]) -> AppResult<()> {
        Ok(())
    }

    async fn consume(&self, _key: &str, _then: &[StoreOp]) -> AppResult<Option<String>> {
        Ok(None)
    }

    async fn scan_prefix(&self, _prefix: &str) -> AppResult<Vec<String>> {
        Ok(Vec::new())
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}
