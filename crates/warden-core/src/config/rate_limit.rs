//! Admission limiter configuration.

use serde::{Deserialize, Serialize};

/// What the limiter does when the shared store cannot answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Admit the request (favor availability).
    #[default]
    FailOpen,
    /// Deny the request (favor strict enforcement).
    FailClosed,
}

/// Login admission limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Sustained login attempts per second. `0` disables login limiting.
    #[serde(default = "default_rps")]
    pub login_rps: f64,
    /// Extra attempts allowed within one window. `0` disables login limiting.
    #[serde(default = "default_burst")]
    pub login_burst: u32,
    /// Window length in seconds.
    #[serde(default = "default_window")]
    pub window_seconds: u64,
    /// Behavior on store errors and timeouts.
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    /// Upper bound for one store round trip, in milliseconds.
    #[serde(default = "default_timeout")]
    pub store_timeout_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            login_rps: default_rps(),
            login_burst: default_burst(),
            window_seconds: default_window(),
            failure_policy: FailurePolicy::default(),
            store_timeout_ms: default_timeout(),
        }
    }
}

fn default_rps() -> f64 {
    1.0
}

fn default_burst() -> u32 {
    5
}

fn default_window() -> u64 {
    1
}

fn default_timeout() -> u64 {
    250
}
