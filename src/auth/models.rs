//! Request-scoped authorization data and the errors raised while building it.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{CourseId, EnrollmentId, UserId};
use crate::errors::Error;

/// Closed set of identity roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Standard,
    Administrator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Standard => "standard",
            Role::Administrator => "administrator",
        }
    }

    pub fn is_admin(&self) -> bool {
        match self {
            Role::Administrator => true,
            Role::Standard => false,
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(Role::Standard),
            "administrator" => Ok(Role::Administrator),
            other => Err(RoleParseError(other.to_string())),
        }
    }
}

/// Error returned when a stored role is outside the known set.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid role: {0}")]
pub struct RoleParseError(pub String);

/// Identity resolved from a valid access token, attached to every
/// authenticated request as an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: UserId,
    pub email: String,
    pub role: Role,
}

impl AuthContext {
    pub fn new(user_id: UserId, email: impl Into<String>, role: Role) -> Self {
        Self { user_id, email: email.into(), role }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// A caller's enrollment in a course, attached by the enrollment gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseEnrollment {
    pub id: EnrollmentId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub progress: i32,
    pub created_at: DateTime<Utc>,
}

/// Errors returned by authentication middleware/services.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("unauthorized: bearer token missing")]
    MissingBearer,
    #[error("unauthorized: malformed bearer token")]
    MalformedBearer,
    #[error("unauthorized: invalid token")]
    InvalidToken,
    #[error("unauthorized: unknown subject")]
    UnknownSubject,
    #[error("forbidden")]
    Forbidden,
    #[error(transparent)]
    Persistence(#[from] Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_known_values() {
        assert_eq!("standard".parse::<Role>().unwrap(), Role::Standard);
        assert_eq!("administrator".parse::<Role>().unwrap(), Role::Administrator);
        assert_eq!(Role::Administrator.to_string(), "administrator");
    }

    #[test]
    fn unknown_role_is_an_error() {
        let err = "admin".parse::<Role>().unwrap_err();
        assert_eq!(err.0, "admin");
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn only_administrator_is_admin() {
        let ctx = AuthContext::new(UserId::new(), "bob@example.com", Role::Standard);
        assert!(!ctx.is_admin());
        let ctx = AuthContext { role: Role::Administrator, ..ctx };
        assert!(ctx.is_admin());
    }
}
