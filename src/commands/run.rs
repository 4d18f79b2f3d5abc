//! `run`: validate startup state and reload the policy on SIGHUP.

use std::sync::Arc;

use clap::Args;
use tracing::{info, warn};

use warden_auth::PolicyEngine;
use warden_cache::StoreManager;
use warden_core::clock::{Clock, SystemClock};
use warden_core::config::AppConfig;
use warden_core::traits::store::SharedStore;

use super::policy::load_policy;

/// Arguments for `run`.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Exit with an error if the shared store is unhealthy at startup
    #[arg(long, default_value_t = false)]
    pub require_store: bool,
}

/// Check keys and store, load the policy, then serve reloads until shutdown.
pub async fn execute(args: &RunArgs, config: AppConfig) -> anyhow::Result<()> {
    info!("Starting Warden v{}", env!("CARGO_PKG_VERSION"));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // ── Step 1: Keys and token service ───────────────────────────
    let tokens = super::token_service(&config)?;
    info!(
        algorithm = %tokens.keys().family(),
        kids = ?tokens.keys().verification_kids(),
        "Token service ready"
    );

    // ── Step 2: Shared store ─────────────────────────────────────
    let store: Arc<dyn SharedStore> = Arc::new(StoreManager::new(&config.store, clock).await?);
    match store.health_check().await {
        Ok(true) => info!(provider = %config.store.provider, "Shared store healthy"),
        Ok(false) | Err(_) if args.require_store => {
            anyhow::bail!("shared store '{}' is not healthy", config.store.provider)
        }
        Ok(false) | Err(_) => {
            warn!(provider = %config.store.provider, "Shared store unhealthy; continuing")
        }
    }

    // ── Step 3: Policy ───────────────────────────────────────────
    let policy = Arc::new(load_policy(None, &config)?);
    info!(roles = ?policy.roles(), "Policy ready");

    wait_for_shutdown(&policy, &config).await;
    info!("Warden stopped");
    Ok(())
}

/// Run until Ctrl+C or SIGTERM, reloading the policy file on SIGHUP.
#[cfg(unix)]
async fn wait_for_shutdown(policy: &Arc<PolicyEngine>, config: &AppConfig) {
    use tokio::signal::unix::{SignalKind, signal};

    let (mut hangup, mut terminate) = match (
        signal(SignalKind::hangup()),
        signal(SignalKind::terminate()),
    ) {
        (Ok(h), Ok(t)) => (h, t),
        (Err(e), _) | (_, Err(e)) => {
            warn!(error = %e, "Cannot install signal handlers; waiting for Ctrl+C only");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = terminate.recv() => break,
            _ = hangup.recv() => reload_policy(policy, config),
        }
    }
    info!("Shutdown signal received");
}

#[cfg(not(unix))]
async fn wait_for_shutdown(_policy: &Arc<PolicyEngine>, _config: &AppConfig) {
    let _ = tokio::signal::ctrl_c().await;
}

fn reload_policy(policy: &PolicyEngine, config: &AppConfig) {
    if !config.policy.reload_on_sighup {
        info!("SIGHUP received; policy reload disabled");
        return;
    }
    match &config.policy.path {
        // Failures are logged by the engine and the current rules stay.
        Some(path) => {
            let _ = policy.reload_from_file(path);
        }
        None => info!("SIGHUP received; no policy file configured"),
    }
}
