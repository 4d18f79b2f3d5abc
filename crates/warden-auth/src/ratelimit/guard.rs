//! Login admission with the standard per-IP and per-account dimensions.

use std::sync::Arc;

use sha2::{Digest, Sha256};

use warden_core::config::RateLimitConfig;

use super::limiter::{AdmissionLimiter, Decision, Dimension};

/// Per-window budget for a sustained rate plus burst: `ceil(rps) + burst`.
pub fn max_for(rps: f64, burst: u32) -> u64 {
    let sustained = if rps.is_finite() && rps > 0.0 {
        rps.ceil() as u64
    } else {
        0
    };
    sustained.saturating_add(u64::from(burst))
}

/// SHA-256 hex of the trimmed, lower-cased e-mail, so keys carry no PII.
pub fn hash_email(email: &str) -> String {
    hex::encode(Sha256::digest(email.trim().to_lowercase().as_bytes()))
}

/// Gates login attempts per client IP and per target account.
#[derive(Debug, Clone)]
pub struct LoginGuard {
    limiter: Arc<AdmissionLimiter>,
    window_seconds: u64,
    max_in_window: u64,
}

impl LoginGuard {
    /// Builds the guard from configuration.
    ///
    /// The budget scales with the window: `max_for(rps * window, burst)`.
    /// A non-positive rate or a zero burst turns login limiting off.
    pub fn new(limiter: Arc<AdmissionLimiter>, config: &RateLimitConfig) -> Self {
        let window_seconds = config.window_seconds.max(1);
        let enabled = config.login_rps > 0.0 && config.login_burst > 0;
        let max_in_window = if enabled {
            max_for(config.login_rps * window_seconds as f64, config.login_burst)
        } else {
            0
        };
        Self {
            limiter,
            window_seconds,
            max_in_window,
        }
    }

    /// Dimensions counted for one login attempt.
    ///
    /// A blank e-mail has no account to protect and adds no dimension.
    pub fn dimensions(&self, ip: &str, email: &str) -> Vec<Dimension> {
        let mut dims = vec![Dimension::new(
            format!("ip:{ip}"),
            self.window_seconds,
            self.max_in_window,
        )];
        if !email.trim().is_empty() {
            dims.push(Dimension::new(
                format!("email:{}", hash_email(email)),
                self.window_seconds,
                self.max_in_window,
            ));
        }
        dims
    }

    /// Counts a login attempt from `ip` against `email`.
    pub async fn check(&self, ip: &str, email: &str) -> Decision {
        self.limiter.allow_all(&self.dimensions(ip, email)).await
    }

    /// Budget per window for each dimension; 0 when limiting is off.
    pub fn max_in_window(&self) -> u64 {
        self.max_in_window
    }

    /// The underlying limiter.
    pub fn limiter(&self) -> &AdmissionLimiter {
        &self.limiter
    }
}
