//! JWT claims structure carried by every access token.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// JWT claims payload embedded in every access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject, the opaque principal id.
    pub sub: String,
    /// Role at the time of issuance.
    pub role: String,
    /// Issuer.
    pub iss: String,
    /// Audience.
    pub aud: String,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
    /// Not-before timestamp (seconds since epoch).
    pub nbf: i64,
    /// Random token id for audit correlation.
    pub jti: String,
}

impl TokenClaims {
    /// Returns the expiration as a `DateTime<Utc>`.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_default()
    }

    /// Seconds left until expiry as seen at `now` (0 if already expired).
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> u64 {
        u64::try_from(self.exp - now.timestamp()).unwrap_or(0)
    }
}

/// Generates a random 128-bit token id, hex encoded.
pub(crate) fn new_jti() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}
