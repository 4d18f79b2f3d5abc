//! Fixed-window admission limiting over the shared store.

pub mod guard;
pub mod limiter;

pub use guard::{LoginGuard, hash_email, max_for};
pub use limiter::{AdmissionLimiter, Decision, Dimension, LimiterSettings};
