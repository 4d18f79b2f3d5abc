//! Login, refresh, logout and authorization flows.
//!
//! The pipeline is the only layer that turns component errors into
//! [`AppError`]s. Clients never learn which token check failed.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use warden_core::clock::Clock;
use warden_core::config::AppConfig;
use warden_core::error::AppError;
use warden_core::result::AppResult;
use warden_core::traits::store::SharedStore;

use crate::error::RefreshError;
use crate::jwt::{SigningKeySet, TokenClaims, TokenService, TokenSettings};
use crate::ratelimit::{AdmissionLimiter, Decision, Dimension, LimiterSettings, LoginGuard};
use crate::rbac::PolicyEngine;
use crate::refresh::RefreshTokenStore;

/// A user as seen by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Opaque principal id, used as the token subject.
    pub id: String,
    /// Login e-mail.
    pub email: String,
    /// Role name resolved by the policy engine.
    pub role: String,
    /// Whether the account may log in.
    pub active: bool,
}

/// Source of user records and credential checks.
#[async_trait]
pub trait UserDirectory: Send + Sync + std::fmt::Debug + 'static {
    /// Look up a user by login e-mail.
    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserRecord>>;

    /// Look up a user by id.
    async fn find_by_id(&self, id: &str) -> AppResult<Option<UserRecord>>;

    /// Check a password against the stored credential.
    async fn verify_password(&self, user: &UserRecord, password: &str) -> AppResult<bool>;
}

/// Tokens handed to a client after login or refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// Signed access token.
    pub access_token: String,
    /// Always `Bearer`.
    pub token_type: String,
    /// Access token expiry.
    pub expires_at: DateTime<Utc>,
    /// Opaque refresh token, absent when refresh is disabled.
    pub refresh_token: Option<String>,
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Token subject.
    pub subject: String,
    /// Role from the token.
    pub role: String,
    /// Full validated claims.
    pub claims: TokenClaims,
}

/// Refresh behaviour of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSettings {
    /// Whether login hands out refresh tokens.
    pub enabled: bool,
    /// Refresh token lifetime.
    pub ttl: Duration,
}

/// Composes the token service, refresh store, policy engine and limiter.
#[derive(Debug, Clone)]
pub struct AuthPipeline {
    tokens: Arc<TokenService>,
    refresh: Arc<RefreshTokenStore>,
    policy: Arc<PolicyEngine>,
    login_guard: Arc<LoginGuard>,
    users: Arc<dyn UserDirectory>,
    refresh_settings: RefreshSettings,
}

impl AuthPipeline {
    /// Creates a pipeline from already built components.
    pub fn new(
        tokens: Arc<TokenService>,
        refresh: Arc<RefreshTokenStore>,
        policy: Arc<PolicyEngine>,
        login_guard: Arc<LoginGuard>,
        users: Arc<dyn UserDirectory>,
        refresh_settings: RefreshSettings,
    ) -> Self {
        Self {
            tokens,
            refresh,
            policy,
            login_guard,
            users,
            refresh_settings,
        }
    }

    /// Builds every component from configuration.
    ///
    /// Key or policy problems are configuration errors and fatal at startup.
    pub fn from_config(
        config: &AppConfig,
        store: Arc<dyn SharedStore>,
        users: Arc<dyn UserDirectory>,
        clock: Arc<dyn Clock>,
    ) -> AppResult<Self> {
        let keys = SigningKeySet::from_config(&config.token)?;
        let tokens = TokenService::new(
            keys,
            TokenSettings::from_config(&config.token),
            clock.clone(),
        );

        let policy = match &config.policy.path {
            Some(path) => PolicyEngine::from_file(path)?,
            None => {
                info!("No policy file configured; using default rules");
                PolicyEngine::default()
            }
        };

        let limiter = AdmissionLimiter::new(
            "login",
            store.clone(),
            clock,
            LimiterSettings::from_config(&config.rate_limit),
        );
        let login_guard = LoginGuard::new(Arc::new(limiter), &config.rate_limit);

        Ok(Self::new(
            Arc::new(tokens),
            Arc::new(RefreshTokenStore::new(store)),
            Arc::new(policy),
            Arc::new(login_guard),
            users,
            RefreshSettings {
                enabled: config.refresh.enabled,
                ttl: Duration::from_secs(config.refresh.ttl_seconds),
            },
        ))
    }

    /// The shared policy engine, for reloads.
    pub fn policy(&self) -> &Arc<PolicyEngine> {
        &self.policy
    }

    /// The token service.
    pub fn tokens(&self) -> &Arc<TokenService> {
        &self.tokens
    }

    // ── Flows ──────────────────────────────────────────────────

    /// Authenticates with e-mail and password.
    pub async fn login(&self, ip: &str, email: &str, password: &str) -> AppResult<TokenPair> {
        if let Decision::Deny {
            retry_after_seconds,
        } = self.login_guard.check(ip, email).await
        {
            info!(ip, retry_after_seconds, "Login rate limited");
            return Err(AppError::rate_limited(retry_after_seconds));
        }

        let invalid = || AppError::authentication("invalid credentials");
        let user = match self.users.find_by_email(email).await? {
            Some(user) if user.active => user,
            _ => {
                debug!(ip, "Login failed: unknown or inactive account");
                return Err(invalid());
            }
        };
        if !self.users.verify_password(&user, password).await? {
            debug!(ip, subject = %user.id, "Login failed: wrong password");
            return Err(invalid());
        }

        if !self.policy.role_exists(&user.role) {
            warn!(subject = %user.id, role = %user.role, "User role is not defined by the policy");
        }

        let (access_token, expires_at) = self.tokens.issue_with_expiry(&user.id, &user.role)?;
        let refresh_token = if self.refresh_settings.enabled {
            Some(self.issue_refresh_token(&user.id).await?)
        } else {
            None
        };

        info!(subject = %user.id, "Login succeeded");
        Ok(TokenPair {
            access_token,
            token_type: "Bearer".to_string(),
            expires_at,
            refresh_token,
        })
    }

    /// Exchanges a refresh token for a fresh pair.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<TokenPair> {
        let (new_refresh, subject) = self.rotate_refresh_token(refresh_token).await?;

        let user = match self.users.find_by_id(&subject).await? {
            Some(user) if user.active => user,
            _ => {
                warn!(subject = %subject, "Refresh for unknown or inactive user");
                if let Err(e) = self.refresh.revoke(&new_refresh).await {
                    warn!(subject = %subject, error = %e, "Failed to revoke orphaned refresh token");
                }
                return Err(AppError::authentication("cannot refresh"));
            }
        };

        let (access_token, expires_at) = self.tokens.issue_with_expiry(&user.id, &user.role)?;
        debug!(subject = %user.id, "Refreshed tokens");
        Ok(TokenPair {
            access_token,
            token_type: "Bearer".to_string(),
            expires_at,
            refresh_token: Some(new_refresh),
        })
    }

    /// Revokes one refresh token. Unknown tokens are already logged out.
    pub async fn logout(&self, refresh_token: &str) -> AppResult<()> {
        match self.refresh.revoke(refresh_token).await {
            Ok(()) => Ok(()),
            Err(RefreshError::InvalidOrExpired) => {
                debug!("Logout with unknown refresh token");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Revokes every refresh token of `subject`.
    pub async fn logout_everywhere(&self, subject: &str) -> AppResult<usize> {
        Ok(self.refresh.revoke_all(subject).await?)
    }

    /// Validates a bearer credential (with or without the `Bearer ` scheme).
    pub async fn authenticate(&self, bearer: &str) -> AppResult<Principal> {
        let token = strip_bearer(bearer);
        let claims = self.validate_access_token(token)?;
        Ok(Principal {
            subject: claims.sub.clone(),
            role: claims.role.clone(),
            claims,
        })
    }

    /// Fails with an authorization error unless `principal` holds `permission`.
    pub fn require_permission(&self, principal: &Principal, permission: &str) -> AppResult<()> {
        if self.authorize(&principal.role, permission) {
            Ok(())
        } else {
            debug!(subject = %principal.subject, role = %principal.role, permission, "Permission denied");
            Err(AppError::authorization(format!("missing permission '{permission}'")))
        }
    }

    // ── Component delegations ──────────────────────────────────

    /// Issues an access token.
    pub fn issue_access_token(&self, subject: &str, role: &str) -> AppResult<String> {
        Ok(self.tokens.issue(subject, role)?)
    }

    /// Validates an access token.
    pub fn validate_access_token(&self, token: &str) -> AppResult<TokenClaims> {
        Ok(self.tokens.validate(token)?)
    }

    /// Issues a refresh token with the configured lifetime.
    pub async fn issue_refresh_token(&self, subject: &str) -> AppResult<String> {
        Ok(self.refresh.issue(subject, self.refresh_settings.ttl).await?)
    }

    /// Rotates a refresh token, returning the new token and its subject.
    pub async fn rotate_refresh_token(&self, token: &str) -> AppResult<(String, String)> {
        Ok(self.refresh.rotate(token, self.refresh_settings.ttl).await?)
    }

    /// Revokes a refresh token.
    pub async fn revoke_refresh_token(&self, token: &str) -> AppResult<()> {
        Ok(self.refresh.revoke(token).await?)
    }

    /// Whether `role` grants `permission`.
    pub fn authorize(&self, role: &str, permission: &str) -> bool {
        self.policy.has_permission(role, permission)
    }

    /// Counts a request for `action` in every dimension and fails when any
    /// is over budget. Each action has its own counters.
    pub async fn admit_or_deny(&self, action: &str, dimensions: &[Dimension]) -> AppResult<()> {
        let limiter = self.login_guard.limiter().for_action(action);
        match limiter.allow_all(dimensions).await {
            Decision::Admit => Ok(()),
            Decision::Deny {
                retry_after_seconds,
            } => Err(AppError::rate_limited(retry_after_seconds)),
        }
    }
}

fn strip_bearer(raw: &str) -> &str {
    let raw = raw.trim();
    match raw.get(..7) {
        Some(scheme) if scheme.eq_ignore_ascii_case("bearer ") => raw[7..].trim_start(),
        _ => raw,
    }
}
