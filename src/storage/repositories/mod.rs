//! Repository traits and their PostgreSQL implementations.

pub mod credential;
pub mod enrollment;

pub use credential::{CredentialRepository, RotationOutcome, SqlxCredentialRepository};
pub use enrollment::{EnrollmentRepository, SqlxEnrollmentRepository};
