//! End-to-end login, refresh, logout and authorization flows.

mod common;

use std::sync::Arc;

use warden_auth::{AuthPipeline, Dimension};
use warden_core::config::{AppConfig, FailurePolicy};
use warden_core::error::ErrorKind;
use warden_core::traits::store::SharedStore;

use common::*;

fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.token = hmac_config("pipeline-secret");
    config.rate_limit.login_rps = 1.0;
    config.rate_limit.login_burst = 4;
    config
}

fn users() -> Arc<StaticUsers> {
    Arc::new(
        StaticUsers::default()
            .with("u-1", "alice@example.com", "admin", "correct horse")
            .with("u-2", "bob@example.com", "user", "battery staple")
            .with("u-3", "eve@example.com", "intern", "pw"),
    )
}

fn pipeline_with(config: &AppConfig, store: Arc<dyn SharedStore>) -> AuthPipeline {
    AuthPipeline::from_config(config, store, users(), clock()).unwrap()
}

fn pipeline() -> AuthPipeline {
    pipeline_with(&config(), memory_store(clock()))
}

#[tokio::test]
async fn test_login_authenticate_authorize() {
    let pipeline = pipeline();
    let pair = pipeline
        .login("10.0.0.1", "alice@example.com", "correct horse")
        .await
        .unwrap();
    assert_eq!(pair.token_type, "Bearer");
    assert!(pair.refresh_token.is_some());

    let principal = pipeline
        .authenticate(&format!("Bearer {}", pair.access_token))
        .await
        .unwrap();
    assert_eq!(principal.subject, "u-1");
    assert_eq!(principal.role, "admin");
    assert!(pipeline.require_permission(&principal, "user:delete").is_ok());

    let bob = pipeline
        .login("10.0.0.2", "bob@example.com", "battery staple")
        .await
        .unwrap();
    let bob = pipeline.authenticate(&bob.access_token).await.unwrap();
    assert!(pipeline.require_permission(&bob, "user:read").is_ok());
    let err = pipeline.require_permission(&bob, "user:delete").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Authorization);
}

#[tokio::test]
async fn test_bad_credentials_are_uniform() {
    let pipeline = pipeline();
    let wrong_pw = pipeline
        .login("10.0.0.1", "alice@example.com", "nope")
        .await
        .unwrap_err();
    let unknown = pipeline
        .login("10.0.0.1", "mallory@example.com", "nope")
        .await
        .unwrap_err();
    assert_eq!(wrong_pw.kind, ErrorKind::Authentication);
    assert_eq!(wrong_pw.message, unknown.message);
}

#[tokio::test]
async fn test_login_rate_limited() {
    let pipeline = pipeline();
    for _ in 0..5 {
        let _ = pipeline.login("10.0.0.9", "bob@example.com", "wrong").await;
    }
    let err = pipeline
        .login("10.0.0.9", "bob@example.com", "battery staple")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::RateLimit);
    assert_eq!(err.retry_after_seconds, Some(1));
}

#[tokio::test]
async fn test_refresh_rotates_once() {
    let pipeline = pipeline();
    let pair = pipeline
        .login("10.0.0.1", "bob@example.com", "battery staple")
        .await
        .unwrap();
    let old = pair.refresh_token.unwrap();

    let next = pipeline.refresh(&old).await.unwrap();
    assert!(pipeline.authenticate(&next.access_token).await.is_ok());
    assert_ne!(next.refresh_token.as_deref(), Some(old.as_str()));

    let replay = pipeline.refresh(&old).await.unwrap_err();
    assert_eq!(replay.kind, ErrorKind::Authentication);
}

#[tokio::test]
async fn test_logout_and_logout_everywhere() {
    let pipeline = pipeline();
    let first = pipeline
        .login("10.0.0.1", "alice@example.com", "correct horse")
        .await
        .unwrap();
    let second = pipeline
        .login("10.0.0.2", "alice@example.com", "correct horse")
        .await
        .unwrap();
    let third = pipeline
        .login("10.0.0.3", "alice@example.com", "correct horse")
        .await
        .unwrap();

    let first_refresh = first.refresh_token.unwrap();
    pipeline.logout(&first_refresh).await.unwrap();
    // Logging out twice is harmless.
    pipeline.logout(&first_refresh).await.unwrap();
    assert!(pipeline.refresh(&first_refresh).await.is_err());

    assert_eq!(pipeline.logout_everywhere("u-1").await.unwrap(), 2);
    assert!(pipeline.refresh(&second.refresh_token.unwrap()).await.is_err());
    assert!(pipeline.refresh(&third.refresh_token.unwrap()).await.is_err());
}

#[tokio::test]
async fn test_invalid_tokens_look_alike() {
    let pipeline = pipeline();
    let pair = pipeline
        .login("10.0.0.1", "bob@example.com", "battery staple")
        .await
        .unwrap();
    let mut tampered = pair.access_token.clone();
    tampered.push('x');

    let a = pipeline.authenticate("garbage").await.unwrap_err();
    let b = pipeline.authenticate(&tampered).await.unwrap_err();
    assert_eq!(a.kind, ErrorKind::Authentication);
    assert_eq!(a.message, "invalid token");
    assert_eq!(a.message, b.message);
}

#[tokio::test]
async fn test_store_outage_is_service_unavailable() {
    let mut config = config();
    config.rate_limit.failure_policy = FailurePolicy::FailOpen;
    let pipeline = pipeline_with(&config, Arc::new(FailingStore));

    let err = pipeline.refresh("any-token").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ServiceUnavailable);

    // Fail-open admission still lets the login reach the refresh store.
    let err = pipeline
        .login("10.0.0.1", "bob@example.com", "battery staple")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ServiceUnavailable);

    config.rate_limit.failure_policy = FailurePolicy::FailClosed;
    let pipeline = pipeline_with(&config, Arc::new(FailingStore));
    let err = pipeline
        .login("10.0.0.1", "bob@example.com", "battery staple")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::RateLimit);
}

#[tokio::test]
async fn test_refresh_disabled() {
    let mut config = config();
    config.refresh.enabled = false;
    let pipeline = pipeline_with(&config, memory_store(clock()));
    let pair = pipeline
        .login("10.0.0.1", "eve@example.com", "pw")
        .await
        .unwrap();
    assert!(pair.refresh_token.is_none());
    // Unknown roles still authenticate but hold no permissions.
    let eve = pipeline.authenticate(&pair.access_token).await.unwrap();
    assert!(!pipeline.authorize(&eve.role, "user:read"));
}

#[tokio::test]
async fn test_delegations() {
    let pipeline = pipeline();
    let token = pipeline.issue_access_token("svc-1", "viewer").unwrap();
    assert_eq!(pipeline.validate_access_token(&token).unwrap().sub, "svc-1");

    let refresh = pipeline.issue_refresh_token("svc-1").await.unwrap();
    let (rotated, subject) = pipeline.rotate_refresh_token(&refresh).await.unwrap();
    assert_eq!(subject, "svc-1");
    pipeline.revoke_refresh_token(&rotated).await.unwrap();
    let err = pipeline.revoke_refresh_token(&rotated).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Authentication);

    let dims = [Dimension::new("api:svc-1", 60, 2)];
    assert!(pipeline.admit_or_deny("api", &dims).await.is_ok());
    assert!(pipeline.admit_or_deny("api", &dims).await.is_ok());
    let err = pipeline.admit_or_deny("api", &dims).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::RateLimit);
    assert_eq!(err.retry_after_seconds, Some(60));
}

#[tokio::test]
async fn test_other_actions_leave_login_budget_alone() {
    let mut config = config();
    config.rate_limit.login_burst = 1;
    let pipeline = pipeline_with(&config, memory_store(clock()));

    let dims = [Dimension::new("ip:9.9.9.9", 1, 100)];
    for _ in 0..3 {
        assert!(pipeline.admit_or_deny("export", &dims).await.is_ok());
    }
    assert!(
        pipeline
            .login("9.9.9.9", "bob@example.com", "battery staple")
            .await
            .is_ok()
    );
}
