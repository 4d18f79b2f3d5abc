//! Typed errors for the auth components and their mapping into [`AppError`].

use std::path::PathBuf;

use thiserror::Error;

use warden_core::error::{AppError, ErrorKind};

/// Why an access token was rejected.
///
/// Callers only ever see "invalid token"; the variant is kept for logs and tests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("token algorithm is not accepted")]
    UnsupportedAlgorithm,
    #[error("token key id is unknown")]
    UnknownKeyId,
    #[error("token has no key id and several keys are configured")]
    AmbiguousKeyId,
    #[error("no key is available for this operation")]
    KeyUnavailable,
    #[error("token signature is invalid")]
    BadSignature,
    #[error("token has expired")]
    Expired,
    #[error("token is not yet valid")]
    NotYetValid,
    #[error("token issuer does not match")]
    IssuerMismatch,
    #[error("token audience does not match")]
    AudienceMismatch,
}

impl From<TokenError> for AppError {
    fn from(_: TokenError) -> Self {
        AppError::authentication("invalid token")
    }
}

/// Failure while loading signing or verification keys at startup.
#[derive(Debug, Error)]
pub enum KeyLoadError {
    #[error("failed to read key file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("public key directory {0} does not exist")]
    MissingDirectory(PathBuf),
    #[error("invalid {algorithm} key in {origin}: {reason}")]
    InvalidKey {
        algorithm: &'static str,
        origin: String,
        reason: String,
    },
    #[error("{0}")]
    Missing(String),
}

impl From<KeyLoadError> for AppError {
    fn from(err: KeyLoadError) -> Self {
        let message = err.to_string();
        AppError::with_source(ErrorKind::Configuration, message, err)
    }
}

/// Refresh token store failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    /// The token is unknown, expired, already rotated or revoked.
    #[error("refresh token is invalid or expired")]
    InvalidOrExpired,
    /// The shared store could not be reached.
    #[error("refresh token store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<RefreshError> for AppError {
    fn from(err: RefreshError) -> Self {
        match err {
            RefreshError::InvalidOrExpired => AppError::authentication("cannot refresh"),
            RefreshError::StoreUnavailable(_) => AppError::service_unavailable("cannot refresh"),
        }
    }
}

/// A rejected rule set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("rule set is empty")]
    EmptyRuleSet,
    #[error("role name is empty")]
    EmptyRole,
    #[error("role '{0}' has an empty permission pattern")]
    EmptyPattern(String),
    #[error("failed to load policy source {path}: {reason}")]
    Source { path: String, reason: String },
}

impl From<PolicyError> for AppError {
    fn from(err: PolicyError) -> Self {
        AppError::configuration(err.to_string())
    }
}
