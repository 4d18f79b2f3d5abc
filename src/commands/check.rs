//! `check-config`: load everything once and report.

use std::sync::Arc;

use serde_json::json;

use warden_cache::StoreManager;
use warden_core::clock::SystemClock;
use warden_core::config::AppConfig;
use warden_core::traits::store::SharedStore;

use super::policy::load_policy;

/// Validate keys, policy and store reachability.
pub async fn execute(config: &AppConfig) -> anyhow::Result<()> {
    let tokens = super::token_service(config)?;
    let policy = load_policy(None, config)?;
    let store = StoreManager::new(&config.store, Arc::new(SystemClock)).await?;
    let store_healthy = store.health_check().await.unwrap_or(false);

    let out = json!({
        "token": {
            "algorithm": tokens.keys().family().to_string(),
            "verification_kids": tokens.keys().verification_kids(),
            "ttl_seconds": tokens.settings().ttl_seconds,
        },
        "policy": policy.snapshot().to_map(),
        "store": {
            "provider": config.store.provider,
            "healthy": store_healthy,
        },
        "rate_limit": {
            "failure_policy": config.rate_limit.failure_policy,
            "window_seconds": config.rate_limit.window_seconds,
        },
    });
    println!("{}", serde_json::to_string_pretty(&out)?);

    if !store_healthy {
        anyhow::bail!("shared store '{}' is not healthy", config.store.provider);
    }
    Ok(())
}
