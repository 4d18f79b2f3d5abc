//! Refresh token persistence in the shared store.
//!
//! Every token has a primary entry (`refresh:<token>` → subject) and a
//! per-subject index entry used by [`RefreshTokenStore::revoke_all`]. Both are
//! written and removed together in one atomic store operation.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use tracing::{debug, error, info};

use warden_cache::keys;
use warden_core::error::AppError;
use warden_core::traits::store::{CONSUMED_VALUE, SharedStore, StoreOp};

use crate::error::RefreshError;

/// Value stored under index entries.
const INDEX_MARKER: &str = "1";

/// Issues, rotates and revokes refresh tokens.
#[derive(Debug, Clone)]
pub struct RefreshTokenStore {
    store: Arc<dyn SharedStore>,
}

impl RefreshTokenStore {
    /// Creates a refresh store over the shared store.
    pub fn new(store: Arc<dyn SharedStore>) -> Self {
        Self { store }
    }

    /// 256 random bits, base64url without padding.
    fn generate_token() -> String {
        URL_SAFE_NO_PAD.encode(rand::random::<[u8; 32]>())
    }

    fn unavailable(op: &'static str) -> impl FnOnce(AppError) -> RefreshError {
        move |e| {
            error!(op, error = %e, "Refresh store operation failed");
            RefreshError::StoreUnavailable(e.message)
        }
    }

    /// Issues a new token owned by `subject`.
    pub async fn issue(&self, subject: &str, ttl: Duration) -> Result<String, RefreshError> {
        let token = Self::generate_token();
        self.store
            .transact(&[
                StoreOp::set(keys::refresh_token(&token), subject, ttl),
                StoreOp::set(keys::refresh_index(subject, &token), INDEX_MARKER, ttl),
            ])
            .await
            .map_err(Self::unavailable("issue"))?;
        debug!(subject, "Issued refresh token");
        Ok(token)
    }

    /// Consumes `old` and issues its replacement in one atomic step.
    ///
    /// Returns the new token and the owning subject. Of concurrent rotations
    /// of the same token, exactly one succeeds.
    pub async fn rotate(&self, old: &str, ttl: Duration) -> Result<(String, String), RefreshError> {
        let new = Self::generate_token();
        let then = [
            StoreOp::delete(keys::refresh_index_unbound(old)),
            StoreOp::set(keys::refresh_token(&new), CONSUMED_VALUE, ttl),
            StoreOp::set(keys::refresh_index_unbound(&new), INDEX_MARKER, ttl),
        ];
        let subject = self
            .store
            .consume(&keys::refresh_token(old), &then)
            .await
            .map_err(Self::unavailable("rotate"))?
            .ok_or(RefreshError::InvalidOrExpired)?;
        debug!(subject = %subject, "Rotated refresh token");
        Ok((new, subject))
    }

    /// Revokes a token. A token that is already gone reports `InvalidOrExpired`.
    pub async fn revoke(&self, token: &str) -> Result<(), RefreshError> {
        let then = [StoreOp::delete(keys::refresh_index_unbound(token))];
        let subject = self
            .store
            .consume(&keys::refresh_token(token), &then)
            .await
            .map_err(Self::unavailable("revoke"))?
            .ok_or(RefreshError::InvalidOrExpired)?;
        debug!(subject = %subject, "Revoked refresh token");
        Ok(())
    }

    /// Returns the owning subject without consuming the token.
    pub async fn validate(&self, token: &str) -> Result<String, RefreshError> {
        self.store
            .get(&keys::refresh_token(token))
            .await
            .map_err(Self::unavailable("validate"))?
            .ok_or(RefreshError::InvalidOrExpired)
    }

    /// Revokes every token of `subject` and returns how many were removed.
    pub async fn revoke_all(&self, subject: &str) -> Result<usize, RefreshError> {
        let prefix = keys::refresh_index_prefix(subject);
        let index_keys = self
            .store
            .scan_prefix(&prefix)
            .await
            .map_err(Self::unavailable("revoke_all"))?;

        let mut revoked = 0;
        for index_key in &index_keys {
            // Tokens never contain ':'; a longer match belongs to a subject sharing this prefix.
            let Some(token) = index_key
                .strip_prefix(prefix.as_str())
                .filter(|t| !t.contains(':'))
            else {
                continue;
            };
            // Tokens rotated concurrently are already gone; only count real removals.
            let removed = self
                .store
                .consume(
                    &keys::refresh_token(token),
                    &[StoreOp::delete(index_key.clone())],
                )
                .await
                .map_err(Self::unavailable("revoke_all"))?;
            match removed {
                Some(_) => revoked += 1,
                None => {
                    self.store
                        .delete(index_key)
                        .await
                        .map_err(Self::unavailable("revoke_all"))?;
                }
            }
        }

        info!(subject, revoked, "Revoked all refresh tokens");
        Ok(revoked)
    }
}
