//! # Configuration Management
//!
//! Environment-driven configuration for the campus auth service. Values are
//! read once at startup (after `dotenvy` has loaded any `.env` file) and
//! validated before the server starts.

pub mod settings;

pub use settings::{AppConfig, AuthConfig, DatabaseConfig, ObservabilityConfig, ServerConfig};
