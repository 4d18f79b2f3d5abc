//! Access token issuing and validation.

use std::collections::HashSet;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Header, Validation, decode, decode_header, encode};
use tracing::{debug, warn};

use warden_core::clock::Clock;
use warden_core::config::TokenConfig;

use crate::error::TokenError;

use super::claims::{TokenClaims, new_jti};
use super::keys::SigningKeySet;

/// Token metadata fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSettings {
    /// Access token lifetime in seconds.
    pub ttl_seconds: u64,
    /// Expected and issued `iss`; empty skips the check.
    pub issuer: String,
    /// Expected and issued `aud`; empty skips the check.
    pub audience: String,
    /// Clock skew tolerance applied to `exp` and `nbf`.
    pub leeway_seconds: u64,
}

impl TokenSettings {
    /// Settings from the token configuration section.
    pub fn from_config(config: &TokenConfig) -> Self {
        Self {
            ttl_seconds: config.ttl_seconds,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            leeway_seconds: config.leeway_seconds,
        }
    }
}

/// Issues and validates signed access tokens.
///
/// Immutable after construction and safe to share across tasks.
#[derive(Debug, Clone)]
pub struct TokenService {
    keys: SigningKeySet,
    settings: TokenSettings,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    /// Creates a token service.
    pub fn new(keys: SigningKeySet, settings: TokenSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            keys,
            settings,
            clock,
        }
    }

    /// Issues a token for `subject` with `role`.
    pub fn issue(&self, subject: &str, role: &str) -> Result<String, TokenError> {
        self.issue_with_expiry(subject, role).map(|(token, _)| token)
    }

    /// Issues a token and returns it with its expiry.
    pub fn issue_with_expiry(
        &self,
        subject: &str,
        role: &str,
    ) -> Result<(String, DateTime<Utc>), TokenError> {
        let slots = self.keys.slots();
        let signing_key = slots.signing.as_ref().ok_or(TokenError::KeyUnavailable)?;

        let now = self.clock.unix_seconds();
        let ttl = i64::try_from(self.settings.ttl_seconds).unwrap_or(i64::MAX);
        let exp = now.saturating_add(ttl);
        let claims = TokenClaims {
            sub: subject.to_string(),
            role: role.to_string(),
            iss: self.settings.issuer.clone(),
            aud: self.settings.audience.clone(),
            iat: now,
            exp,
            nbf: now,
            jti: new_jti(),
        };

        let mut header = Header::new(self.keys.algorithm());
        header.typ = Some("JWT".to_string());
        header.kid = slots.kid.clone();

        let token = encode(&header, &claims, signing_key).map_err(|e| {
            warn!(error = %e, "Failed to sign access token");
            TokenError::KeyUnavailable
        })?;

        Ok((token, DateTime::from_timestamp(exp, 0).unwrap_or_default()))
    }

    /// Validates a token and returns its claims.
    ///
    /// The signature is checked before any claim; issuer and audience are
    /// compared exactly when configured.
    pub fn validate(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let result = self.validate_inner(token);
        if let Err(reason) = &result {
            debug!(reason = %reason, "Rejected access token");
        }
        result
    }

    fn validate_inner(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let segments: Vec<&str> = token.split('.').collect();
        let [_, payload, _] = segments.as_slice() else {
            return Err(TokenError::Malformed);
        };

        let header = decode_header(token).map_err(|_| TokenError::Malformed)?;
        if header.alg != self.keys.algorithm() {
            return Err(TokenError::UnsupportedAlgorithm);
        }

        // Decode the payload up front so any later base64 failure can only
        // come from the signature segment.
        let payload = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| TokenError::Malformed)?;
        serde_json::from_slice::<TokenClaims>(&payload).map_err(|_| TokenError::Malformed)?;

        let key = self.keys.slots().resolve(header.kid.as_deref())?;

        let mut validation = Validation::new(self.keys.algorithm());
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        let claims = decode::<TokenClaims>(token, key, &validation)
            .map_err(|e| match e.kind() {
                JwtErrorKind::InvalidAlgorithm => TokenError::UnsupportedAlgorithm,
                JwtErrorKind::Json(_) | JwtErrorKind::Utf8(_) | JwtErrorKind::InvalidToken => {
                    TokenError::Malformed
                }
                _ => TokenError::BadSignature,
            })?
            .claims;

        self.check_timing(&claims)?;

        if !self.settings.issuer.is_empty() && claims.iss != self.settings.issuer {
            return Err(TokenError::IssuerMismatch);
        }
        if !self.settings.audience.is_empty() && claims.aud != self.settings.audience {
            return Err(TokenError::AudienceMismatch);
        }

        Ok(claims)
    }

    /// Valid iff `nbf - leeway <= now <= exp + leeway`.
    fn check_timing(&self, claims: &TokenClaims) -> Result<(), TokenError> {
        let now = self.clock.unix_seconds();
        let leeway = i64::try_from(self.settings.leeway_seconds).unwrap_or(i64::MAX);
        if now > claims.exp.saturating_add(leeway) {
            return Err(TokenError::Expired);
        }
        if now < claims.nbf.saturating_sub(leeway) {
            return Err(TokenError::NotYetValid);
        }
        Ok(())
    }

    /// The configured settings.
    pub fn settings(&self) -> &TokenSettings {
        &self.settings
    }

    /// The loaded key set.
    pub fn keys(&self) -> &SigningKeySet {
        &self.keys
    }
}
