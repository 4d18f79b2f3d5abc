//! Store key builders for every Warden entry.
//!
//! Centralising key construction keeps the refresh store and the limiter
//! from drifting apart on key layout. Backend prefixes (e.g. `warden:`) are
//! applied by the provider, not here.

use warden_core::traits::CONSUMED_VALUE;

// ── Refresh tokens ─────────────────────────────────────────

/// Primary refresh entry: token → subject.
pub fn refresh_token(token: &str) -> String {
    format!("refresh:{token}")
}

/// Secondary per-subject index entry.
pub fn refresh_index(subject: &str, token: &str) -> String {
    format!("refresh_user:{subject}:{token}")
}

/// Prefix of every index entry owned by `subject`.
pub fn refresh_index_prefix(subject: &str) -> String {
    format!("refresh_user:{subject}:")
}

/// Index entry whose subject is bound later by an atomic consume.
pub fn refresh_index_unbound(token: &str) -> String {
    refresh_index(CONSUMED_VALUE, token)
}

// ── Rate limiting ──────────────────────────────────────────

/// Counter for one admission dimension in one window bucket.
pub fn rate_window(action: &str, subject_key: &str, bucket: i64) -> String {
    format!("rl:{action}:{subject_key}:{bucket}")
}
