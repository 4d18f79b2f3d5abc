//! Application configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate. Each
//! sub-module represents a logical configuration section, and every field
//! has a serde default so an empty source yields a usable development setup.

pub mod logging;
pub mod policy;
pub mod rate_limit;
pub mod refresh;
pub mod store;
pub mod token;

use serde::{Deserialize, Serialize};

pub use self::logging::LoggingConfig;
pub use self::policy::PolicyConfig;
pub use self::rate_limit::{FailurePolicy, RateLimitConfig};
pub use self::refresh::RefreshConfig;
pub use self::store::{MemoryStoreConfig, RedisStoreConfig, StoreConfig};
pub use self::token::{SigningAlgorithm, TokenConfig};

use crate::error::AppError;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Access token signing and validation.
    #[serde(default)]
    pub token: TokenConfig,
    /// Refresh token lifetime.
    #[serde(default)]
    pub refresh: RefreshConfig,
    /// RBAC policy source.
    #[serde(default)]
    pub policy: PolicyConfig,
    /// Admission limits for sensitive actions.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Shared store backend.
    #[serde(default)]
    pub store: StoreConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration.
    ///
    /// Merges `config/default`, the environment overlay `config/{env}`, and
    /// environment variables prefixed with `WARDEN__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        Self::load_from("config/default", env)
    }

    /// Load configuration with an explicit base file (extension optional).
    pub fn load_from(base: &str, env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(base).required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("WARDEN")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects combinations that would only fail later at request time.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.token.ttl_seconds == 0 {
            return Err(AppError::configuration("token.ttl_seconds must be positive"));
        }
        if self.refresh.enabled && self.refresh.ttl_seconds == 0 {
            return Err(AppError::configuration(
                "refresh.ttl_seconds must be positive when refresh is enabled",
            ));
        }
        if self.rate_limit.window_seconds == 0 {
            return Err(AppError::configuration(
                "rate_limit.window_seconds must be positive",
            ));
        }
        if self.token.algorithm == SigningAlgorithm::Hs256
            && self.token.secret.trim().is_empty()
        {
            return Err(AppError::configuration("token.secret is required for hs256"));
        }
        Ok(())
    }
}
