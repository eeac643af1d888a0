//! Domain layer
//!
//! Identifier types shared by the auth, storage and API layers. These have
//! no dependency on HTTP or on a particular repository implementation.

pub mod id;

pub use id::{CourseId, EnrollmentId, UserId};
