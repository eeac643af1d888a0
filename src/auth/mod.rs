//! Authentication and authorization module entry point.
//!
//! Password hashing, the two-class JWT issuer, the session lifecycle
//! (sign-up, sign-in, refresh rotation, logout), identity administration and
//! the axum middleware that turns a bearer token into an [`AuthContext`].

pub mod auth_service;
pub mod hashing;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod session;
pub mod user;
pub mod user_service;
pub mod user_validation;

pub use auth_service::AuthService;
pub use hashing::{PasswordHashError, PasswordHasher};
pub use jwt::{Claims, TokenError, TokenIssuer, TokenKeys, TokenPair};
pub use models::{AuthContext, AuthError, CourseEnrollment, Role};
pub use session::{SessionCookie, SessionGrant, SessionService, REFRESH_COOKIE_NAME};
pub use user::{LoginRequest, ProfileFields, RegisterRequest, UpdateProfileRequest, User};
pub use user_service::UserService;
pub use user_validation::{CredentialValidator, RegexCredentialValidator};
