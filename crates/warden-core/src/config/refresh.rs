//! Refresh token configuration.

use serde::{Deserialize, Serialize};

/// Refresh token settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Whether login issues refresh tokens.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Refresh token lifetime in seconds.
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            ttl_seconds: default_ttl(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_ttl() -> u64 {
    604_800
}
