//! # Campus Auth
//!
//! Credential, session and authorization layer for the campus learning
//! platform backend.
//!
//! ## Architecture
//!
//! ```text
//! REST API (axum) → Session / User services → Credential store (PostgreSQL)
//!      ↓                     ↓
//! Auth middleware      JWT issuer + Argon2 hasher
//! ```
//!
//! ## Core Components
//!
//! - **Session service**: sign-up, sign-in, refresh rotation with replay
//!   detection, and logout. Each identity keeps exactly one live refresh token.
//! - **Auth middleware**: resolves `Authorization: Bearer` access tokens to an
//!   [`auth::AuthContext`], plus an administrator gate and a course-enrollment gate.
//! - **Storage**: SQLx repositories whose session writes run under row locks.

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod storage;

// Re-export commonly used types and traits
pub use config::AppConfig;
pub use errors::{CampusError, Error, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
