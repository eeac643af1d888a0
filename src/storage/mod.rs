//! # Storage and Persistence
//!
//! PostgreSQL connectivity, schema migrations and the repositories behind the
//! credential store and the enrollment lookup.

pub mod migrations;
pub mod pool;
pub mod repositories;

#[cfg(test)]
pub mod test_helpers;

pub use crate::config::DatabaseConfig;

pub use migrations::{
    list_applied_migrations, run_migrations as run_db_migrations, validate_migrations,
    MigrationInfo,
};
pub use pool::{create_pool, DbPool};
pub use repositories::{
    CredentialRepository, EnrollmentRepository, RotationOutcome, SqlxCredentialRepository,
    SqlxEnrollmentRepository,
};
