//! Common test utilities for all integration tests.
//!
//! Provides the PostgreSQL test database and fixture builders.

#![allow(dead_code)]
#![allow(clippy::duplicate_mod)]

pub mod test_db;

use std::sync::Arc;
use std::time::Duration;

use campus_auth::auth::user::{NewIdentity, ProfileFields, RegisterRequest};
use campus_auth::auth::{
    PasswordHasher, RegexCredentialValidator, Role, SessionService, TokenIssuer, TokenKeys,
};
use campus_auth::domain::{CourseId, UserId};
use campus_auth::storage::{DbPool, SqlxCredentialRepository};
use chrono::NaiveDate;

pub const PASSWORD: &str = "Passw0rd!";

pub fn profile(email: &str) -> ProfileFields {
    ProfileFields {
        email: email.to_string(),
        name: "Alice".to_string(),
        birthdate: NaiveDate::from_ymd_opt(1995, 4, 12).expect("valid date"),
        phone_number: "+79991234567".to_string(),
        telegram: "@alice_learns".to_string(),
        city: "Kazan".to_string(),
        age: Some(29),
        employment: "employed".to_string(),
        is_business_owner: "no".to_string(),
        position_at_work: "analyst".to_string(),
        month_income: Some(120_000),
    }
}

pub fn registration(email: &str) -> RegisterRequest {
    RegisterRequest { profile: profile(email), password: PASSWORD.to_string() }
}

pub fn new_identity(email: &str, role: Role, refresh_token: &str) -> NewIdentity {
    NewIdentity {
        id: UserId::new(),
        password_hash: "$argon2id$v=19$m=8,t=1,p=1$c2FsdHNhbHQ$aGFzaA".to_string(),
        role,
        profile: profile(email),
        refresh_token: refresh_token.to_string(),
    }
}

pub fn token_issuer() -> Arc<TokenIssuer> {
    Arc::new(TokenIssuer::new(
        TokenKeys::new(b"integration-access-secret-0123456789", Duration::from_secs(60)),
        TokenKeys::new(b"integration-refresh-secret-0123456789", Duration::from_secs(3600)),
    ))
}

/// Session service over PostgreSQL with a cheap hasher.
pub fn session_service(pool: &DbPool) -> SessionService {
    SessionService::new(
        Arc::new(SqlxCredentialRepository::new(pool.clone())),
        token_issuer(),
        PasswordHasher::new(8, 1, 1).expect("valid test parameters"),
        Arc::new(RegexCredentialValidator),
    )
}

pub async fn insert_course(pool: &DbPool, title: &str) -> CourseId {
    let id = CourseId::new();
    sqlx::query("INSERT INTO courses (id, title) VALUES ($1, $2)")
        .bind(id)
        .bind(title)
        .execute(pool)
        .await
        .expect("insert course");
    id
}

pub async fn count_rows(pool: &DbPool, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .expect("count rows")
}
