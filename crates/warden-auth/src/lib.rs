//! # warden-auth
//!
//! Authentication and authorization building blocks for Warden.
//!
//! ## Modules
//!
//! - `jwt`: access token issuing and validation with key rotation
//! - `refresh`: opaque single-use refresh tokens in the shared store
//! - `rbac`: role to permission-pattern policy with atomic hot reload
//! - `ratelimit`: fixed-window admission limiting over the shared store
//! - `pipeline`: login, refresh, logout and authorization orchestration

pub mod error;
pub mod jwt;
pub mod pipeline;
pub mod ratelimit;
pub mod rbac;
pub mod refresh;

pub use error::{KeyLoadError, PolicyError, RefreshError, TokenError};
pub use jwt::{SigningKeySet, TokenClaims, TokenService, TokenSettings};
pub use pipeline::{
    AuthPipeline, Principal, RefreshSettings, TokenPair, UserDirectory, UserRecord,
};
pub use ratelimit::{AdmissionLimiter, Decision, Dimension, LoginGuard};
pub use rbac::{PolicyEngine, RuleSet};
pub use refresh::RefreshTokenStore;
