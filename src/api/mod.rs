//! # REST API
//!
//! Axum routes for sign-up, sign-in, refresh, logout, identity administration
//! and course enrollment, with the JSON error envelope they share.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use routes::{build_router, ApiState};
pub use server::start_api_server;
