//! Refresh token single-use semantics against the shared store.

mod common;

use std::sync::Arc;
use std::time::Duration;

use warden_auth::{RefreshError, RefreshTokenStore};

use common::*;

const TTL: Duration = Duration::from_secs(7 * 24 * 3600);

fn refresh_store() -> RefreshTokenStore {
    RefreshTokenStore::new(memory_store(clock()))
}

#[tokio::test]
async fn test_double_rotate_sequential() {
    let store = refresh_store();
    let token = store.issue("user-1", TTL).await.unwrap();

    let (next, subject) = store.rotate(&token, TTL).await.unwrap();
    assert_eq!(subject, "user-1");
    assert_ne!(next, token);
    assert_eq!(store.rotate(&token, TTL).await, Err(RefreshError::InvalidOrExpired));

    // The replacement is itself single-use.
    assert!(store.rotate(&next, TTL).await.is_ok());
    assert_eq!(store.rotate(&next, TTL).await, Err(RefreshError::InvalidOrExpired));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_double_rotate_concurrent() {
    let store = Arc::new(refresh_store());
    for _ in 0..20 {
        let token = store.issue("user-1", TTL).await.unwrap();
        let attempts = (0..8).map(|_| {
            let store = store.clone();
            let token = token.clone();
            tokio::spawn(async move { store.rotate(&token, TTL).await })
        });
        let results = futures::future::join_all(attempts).await;
        let successes = results
            .iter()
            .filter(|r| matches!(r, Ok(Ok(_))))
            .count();
        let rejected = results
            .iter()
            .filter(|r| matches!(r, Ok(Err(RefreshError::InvalidOrExpired))))
            .count();
        assert_eq!(successes, 1);
        assert_eq!(rejected, 7);
    }
}

#[tokio::test]
async fn test_revoke_then_validate() {
    let store = refresh_store();
    let token = store.issue("user-1", TTL).await.unwrap();
    assert_eq!(store.validate(&token).await.unwrap(), "user-1");

    store.revoke(&token).await.unwrap();
    assert_eq!(store.validate(&token).await, Err(RefreshError::InvalidOrExpired));
    assert_eq!(store.rotate(&token, TTL).await, Err(RefreshError::InvalidOrExpired));
}

#[tokio::test]
async fn test_revoke_all() {
    let store = refresh_store();
    let a = store.issue("user-1", TTL).await.unwrap();
    let b = store.issue("user-1", TTL).await.unwrap();
    let (c, _) = store.rotate(&b, TTL).await.unwrap();
    let other = store.issue("user-10", TTL).await.unwrap();

    assert_eq!(store.revoke_all("user-1").await.unwrap(), 2);
    for token in [&a, &b, &c] {
        assert_eq!(store.validate(token).await, Err(RefreshError::InvalidOrExpired));
    }
    assert_eq!(store.validate(&other).await.unwrap(), "user-10");
    assert_eq!(store.revoke_all("user-1").await.unwrap(), 0);
}

#[tokio::test]
async fn test_store_failure_is_not_invalid_token() {
    let store = RefreshTokenStore::new(Arc::new(FailingStore));
    assert!(matches!(
        store.issue("user-1", TTL).await,
        Err(RefreshError::StoreUnavailable(_))
    ));
    assert!(matches!(
        store.rotate("whatever", TTL).await,
        Err(RefreshError::StoreUnavailable(_))
    ));
    assert!(matches!(
        store.revoke("whatever").await,
        Err(RefreshError::StoreUnavailable(_))
    ));
    assert!(matches!(
        store.validate("whatever").await,
        Err(RefreshError::StoreUnavailable(_))
    ));
}
