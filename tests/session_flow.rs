//! Session lifecycle against PostgreSQL, including concurrent refreshes.
//!
//! Run with: cargo test --features postgres_tests --test session_flow

#![cfg(feature = "postgres_tests")]

mod common;

use campus_auth::auth::LoginRequest;
use campus_auth::errors::AuthErrorType;
use campus_auth::storage::{CredentialRepository, SqlxCredentialRepository};
use campus_auth::CampusError;
use common::test_db::TestDatabase;
use common::{count_rows, registration, session_service, PASSWORD};
use futures::future::join_all;

fn login(email: &str, password: &str) -> LoginRequest {
    LoginRequest { email: email.to_string(), password: password.to_string() }
}

fn auth_type(err: &CampusError) -> Option<AuthErrorType> {
    err.auth_error_type()
}

#[tokio::test]
async fn register_login_refresh_replay_scenario() {
    let db = TestDatabase::new("session_scenario").await;
    let service = session_service(&db.pool);

    let r0 = service.register(registration("alice@example.com")).await.unwrap().tokens.refresh_token;

    let signed_in = service.login(&login("alice@example.com", PASSWORD)).await.unwrap();
    let wrong = service.login(&login("alice@example.com", "Wr0ngPass!")).await.unwrap_err();
    assert_eq!(auth_type(&wrong), Some(AuthErrorType::InvalidCredentials));

    // Sign-in replaced r0
    let stale = service.refresh(&r0).await.unwrap_err();
    assert_eq!(auth_type(&stale), Some(AuthErrorType::ReusedToken));

    let r1 = signed_in.tokens.refresh_token;
    let r2 = service.refresh(&r1).await.unwrap().tokens.refresh_token;
    let replay = service.refresh(&r1).await.unwrap_err();
    assert_eq!(auth_type(&replay), Some(AuthErrorType::ReusedToken));
    service.refresh(&r2).await.unwrap();
}

#[tokio::test]
async fn weak_input_and_duplicates_leave_no_rows() {
    let db = TestDatabase::new("session_weak_input").await;
    let service = session_service(&db.pool);

    let mut weak = registration("alice@example.com");
    weak.password = "short".to_string();
    assert!(matches!(service.register(weak).await, Err(CampusError::Validation { .. })));
    assert_eq!(count_rows(&db.pool, "identities").await, 0);

    service.register(registration("alice@example.com")).await.unwrap();
    assert!(matches!(
        service.register(registration("alice@example.com")).await,
        Err(CampusError::Conflict { .. })
    ));
    assert_eq!(count_rows(&db.pool, "identities").await, 1);
}

#[tokio::test]
async fn logout_blanks_the_stored_token() {
    let db = TestDatabase::new("session_logout").await;
    let service = session_service(&db.pool);
    let repo = SqlxCredentialRepository::new(db.pool.clone());

    let grant = service.register(registration("alice@example.com")).await.unwrap();
    service.logout(&grant.user_id).await.unwrap();

    assert_eq!(repo.get_refresh_token(&grant.user_id).await.unwrap().as_deref(), Some(""));
    let err = service.refresh(&grant.tokens.refresh_token).await.unwrap_err();
    assert_eq!(auth_type(&err), Some(AuthErrorType::ReusedToken));
}

#[tokio::test]
async fn concurrent_refreshes_of_one_token_succeed_exactly_once() {
    let db = TestDatabase::new("session_concurrency").await;
    let service = session_service(&db.pool);
    let repo = SqlxCredentialRepository::new(db.pool.clone());

    let grant = service.register(registration("alice@example.com")).await.unwrap();
    let r0 = grant.tokens.refresh_token.clone();

    let attempts = (0..6).map(|_| {
        let service = service.clone();
        let token = r0.clone();
        tokio::spawn(async move { service.refresh(&token).await })
    });
    let results: Vec<_> =
        join_all(attempts).await.into_iter().map(|joined| joined.unwrap()).collect();

    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    for failure in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(auth_type(failure), Some(AuthErrorType::ReusedToken));
    }

    // The stored token is the winner's, so the winner can keep refreshing
    let stored = repo.get_refresh_token(&grant.user_id).await.unwrap().unwrap();
    assert_eq!(stored, winners[0].tokens.refresh_token);
    service.refresh(&stored).await.unwrap();
}
