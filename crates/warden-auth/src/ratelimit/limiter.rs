//! Distributed fixed-window counter.
//!
//! Each `(action, subject key, window bucket)` owns one counter in the shared
//! store. Counting and expiry happen in a single store call, so every service
//! instance sees the same count.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use warden_cache::keys;
use warden_core::clock::Clock;
use warden_core::config::{FailurePolicy, RateLimitConfig};
use warden_core::traits::store::SharedStore;

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The request may proceed.
    Admit,
    /// The request is over budget.
    Deny {
        /// Seconds until the current window ends (at least 1).
        retry_after_seconds: u64,
    },
}

impl Decision {
    /// Whether the request may proceed.
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admit)
    }

    /// Retry hint for a denial.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::Admit => None,
            Self::Deny {
                retry_after_seconds,
            } => Some(*retry_after_seconds),
        }
    }
}

/// One independent counter applied to an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    /// Identity being counted, e.g. `ip:10.0.0.1`.
    pub subject_key: String,
    /// Window length in seconds.
    pub window_seconds: u64,
    /// Requests admitted per window; 0 disables the dimension.
    pub max_in_window: u64,
}

impl Dimension {
    /// Builds a dimension.
    pub fn new(subject_key: impl Into<String>, window_seconds: u64, max_in_window: u64) -> Self {
        Self {
            subject_key: subject_key.into(),
            window_seconds,
            max_in_window,
        }
    }
}

/// How the limiter behaves when the store misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimiterSettings {
    /// Admit or deny when the store fails or times out.
    pub failure_policy: FailurePolicy,
    /// Upper bound for one store round trip.
    pub store_timeout: Duration,
}

impl LimiterSettings {
    /// Settings from the rate limit configuration section.
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self {
            failure_policy: config.failure_policy,
            store_timeout: Duration::from_millis(config.store_timeout_ms),
        }
    }
}

/// Admission limiter for one action (e.g. `login`).
#[derive(Debug, Clone)]
pub struct AdmissionLimiter {
    action: String,
    store: Arc<dyn SharedStore>,
    clock: Arc<dyn Clock>,
    settings: LimiterSettings,
}

impl AdmissionLimiter {
    /// Creates a limiter counting under `action`.
    pub fn new(
        action: impl Into<String>,
        store: Arc<dyn SharedStore>,
        clock: Arc<dyn Clock>,
        settings: LimiterSettings,
    ) -> Self {
        Self {
            action: action.into(),
            store,
            clock,
            settings,
        }
    }

    /// The action this limiter counts.
    pub fn action(&self) -> &str {
        &self.action
    }

    /// A limiter for another action sharing this store, clock and settings.
    ///
    /// Counters are keyed by action, so budgets never mix across actions.
    pub fn for_action(&self, action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            store: self.store.clone(),
            clock: self.clock.clone(),
            settings: self.settings,
        }
    }

    /// Counts one request for `subject_key` and decides on it.
    pub async fn allow(&self, subject_key: &str, window_seconds: u64, max_in_window: u64) -> Decision {
        if max_in_window == 0 {
            return Decision::Admit;
        }
        let window = window_seconds.max(1);
        let now = u64::try_from(self.clock.unix_seconds()).unwrap_or(0);
        let bucket = now / window;
        let retry_after_seconds = (window - now % window).max(1);
        let key = keys::rate_window(
            &self.action,
            subject_key,
            i64::try_from(bucket).unwrap_or(i64::MAX),
        );

        let counted = tokio::time::timeout(
            self.settings.store_timeout,
            self.store.incr_with_expiry(&key, Duration::from_secs(window)),
        )
        .await;

        let count = match counted {
            Ok(Ok(count)) => count,
            Ok(Err(e)) => {
                warn!(action = %self.action, error = %e, policy = ?self.settings.failure_policy, "Admission store error");
                return self.on_failure(retry_after_seconds);
            }
            Err(_) => {
                warn!(
                    action = %self.action,
                    timeout_ms = self.settings.store_timeout.as_millis() as u64,
                    policy = ?self.settings.failure_policy,
                    "Admission store timed out"
                );
                return self.on_failure(retry_after_seconds);
            }
        };

        if u64::try_from(count).unwrap_or(0) > max_in_window {
            debug!(action = %self.action, count, max_in_window, "Admission denied");
            Decision::Deny {
                retry_after_seconds,
            }
        } else {
            Decision::Admit
        }
    }

    /// Counts one request in every dimension; denies if any is over budget.
    ///
    /// All dimensions are counted even after one denies, and the longest
    /// retry hint wins.
    pub async fn allow_all(&self, dimensions: &[Dimension]) -> Decision {
        let mut decision = Decision::Admit;
        for dim in dimensions {
            let current = self
                .allow(&dim.subject_key, dim.window_seconds, dim.max_in_window)
                .await;
            decision = match (decision.retry_after(), current.retry_after()) {
                (Some(a), Some(b)) => Decision::Deny {
                    retry_after_seconds: a.max(b),
                },
                (None, Some(_)) => current,
                _ => decision,
            };
        }
        decision
    }

    fn on_failure(&self, retry_after_seconds: u64) -> Decision {
        match self.settings.failure_policy {
            FailurePolicy::FailOpen => Decision::Admit,
            FailurePolicy::FailClosed => Decision::Deny {
                retry_after_seconds,
            },
        }
    }
}
