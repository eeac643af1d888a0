//! # Error Handling
//!
//! Crate-wide error type and result alias. Component-level errors
//! (token issuing, password hashing, request authentication) live next to
//! their components and convert into [`CampusError`].

pub mod types;

pub use types::{AuthErrorType, CampusError, Result};

/// Short alias used across services.
pub type Error = CampusError;
