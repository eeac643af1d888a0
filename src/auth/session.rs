//! Session lifecycle for password-authenticated identities.
//!
//! Each identity holds at most one live refresh token, stored server side.
//! Sign-up and sign-in overwrite it, a refresh swaps it for a new one under a
//! row lock, and logout blanks it. Presenting any other value is treated as
//! replay of a rotated token.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::auth::hashing::PasswordHasher;
use crate::auth::jwt::{TokenIssuer, TokenPair};
use crate::auth::models::Role;
use crate::auth::user::{LoginRequest, NewIdentity, RegisterRequest};
use crate::auth::user_validation::{CredentialValidator, RegexCredentialValidator};
use crate::config::AuthConfig;
use crate::domain::UserId;
use crate::errors::{AuthErrorType, CampusError, Result};
use crate::observability::metrics;
use crate::storage::repositories::{
    CredentialRepository, RotationOutcome, SqlxCredentialRepository,
};
use crate::storage::DbPool;

/// Name of the cookie carrying the refresh token
pub const REFRESH_COOKIE_NAME: &str = "refresh_token";

const DUMMY_PASSWORD: &str = "campus-dummy-password";

/// Used only if hashing the dummy password fails at construction.
const FALLBACK_DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$dW5rbm93bnNhbHQ$3mQb5ToVGrAa4ldvUV2uEY1/9RZ8pFgLe2vQ1a0Kc3Q";

/// Tokens handed out by a successful sign-up, sign-in or refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionGrant {
    pub user_id: UserId,
    pub role: Role,
    pub tokens: TokenPair,
}

/// Secure cookie builder result
#[derive(Debug, Clone)]
pub struct SessionCookie {
    pub name: String,
    /// Empty when clearing
    pub value: String,
    pub max_age: Duration,
    pub http_only: bool,
    /// Secure flag (HTTPS only)
    pub secure: bool,
    pub same_site: SameSitePolicy,
    pub path: String,
}

/// SameSite cookie policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSitePolicy {
    Strict,
    Lax,
    None,
}

#[derive(Clone)]
pub struct SessionService {
    repository: Arc<dyn CredentialRepository>,
    tokens: Arc<TokenIssuer>,
    hasher: PasswordHasher,
    validator: Arc<dyn CredentialValidator>,
    /// Verified when the email is unknown so a miss costs the same as a mismatch
    dummy_hash: Arc<str>,
    cookie_path: String,
    cookie_secure: bool,
}

impl SessionService {
    pub fn new(
        repository: Arc<dyn CredentialRepository>,
        tokens: Arc<TokenIssuer>,
        hasher: PasswordHasher,
        validator: Arc<dyn CredentialValidator>,
    ) -> Self {
        let dummy_hash = hasher
            .hash(DUMMY_PASSWORD)
            .unwrap_or_else(|_| FALLBACK_DUMMY_HASH.to_string());

        Self {
            repository,
            tokens,
            hasher,
            validator,
            dummy_hash: Arc::from(dummy_hash),
            cookie_path: "/".to_string(),
            cookie_secure: true,
        }
    }

    pub fn with_cookie_settings(mut self, path: impl Into<String>, secure: bool) -> Self {
        self.cookie_path = path.into();
        self.cookie_secure = secure;
        self
    }

    pub fn with_sqlx(pool: DbPool, tokens: Arc<TokenIssuer>, config: &AuthConfig) -> Result<Self> {
        let hasher = PasswordHasher::from_config(config)?;
        Ok(Self::new(
            Arc::new(SqlxCredentialRepository::new(pool)),
            tokens,
            hasher,
            Arc::new(RegexCredentialValidator),
        )
        .with_cookie_settings(config.cookie_path.clone(), config.cookie_secure))
    }

    /// Create an identity, its profile and its first session.
    ///
    /// # Errors
    ///
    /// - `Validation` when a field or the password fails the shape checks
    /// - `Conflict` (resource `profile`) when the email is already registered
    /// - `Database` on storage failure; nothing is persisted in that case
    #[instrument(skip(self, request), fields(email = %request.profile.email))]
    pub async fn register(&self, request: RegisterRequest) -> Result<SessionGrant> {
        let RegisterRequest { profile, password } = request;

        if let Err(errors) = self.validator.check_registration(&profile, &password) {
            metrics::record_registration("invalid_input").await;
            return Err(CampusError::from(errors));
        }

        let password_hash = self.hasher.hash_blocking(password).await?;
        let id = UserId::new();
        let tokens = self.tokens.issue_pair(&profile.email)?;

        let new_identity = NewIdentity {
            id,
            password_hash,
            role: Role::Standard,
            profile,
            refresh_token: tokens.refresh_token.clone(),
        };

        let user = match self.repository.create_identity(new_identity).await {
            Ok(user) => user,
            Err(err) => {
                let status =
                    if matches!(err, CampusError::Conflict { .. }) { "duplicate_email" } else { "error" };
                metrics::record_registration(status).await;
                return Err(err);
            }
        };

        metrics::record_registration("success").await;
        info!(user_id = %user.id, "identity registered");

        Ok(SessionGrant { user_id: user.id, role: user.role, tokens })
    }

    /// Authenticate by email and password, replacing any existing session.
    ///
    /// Unknown email and wrong password produce the same error.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: &LoginRequest) -> Result<SessionGrant> {
        let identity = match self.repository.find_credentials_by_email(&request.email).await? {
            Some(identity) => identity,
            None => {
                if let Err(e) = self
                    .hasher
                    .verify_blocking(request.password.clone(), self.dummy_hash.to_string())
                    .await
                {
                    warn!(error = %e, "dummy hash verification failed unexpectedly");
                }
                warn!("login attempt for unknown email");
                metrics::record_login("invalid_credentials").await;
                return Err(invalid_credentials());
            }
        };

        let matches = self
            .hasher
            .verify_blocking(request.password.clone(), identity.password_hash.clone())
            .await?;
        if !matches {
            warn!(user_id = %identity.id, "login attempt with incorrect password");
            metrics::record_login("invalid_credentials").await;
            return Err(invalid_credentials());
        }

        let tokens = self.tokens.issue_pair(&request.email)?;
        self.repository.set_refresh_token(&identity.id, &tokens.refresh_token).await?;

        metrics::record_login("success").await;
        info!(user_id = %identity.id, "identity signed in");

        Ok(SessionGrant { user_id: identity.id, role: identity.role, tokens })
    }

    /// Exchange a refresh token for a new pair. The presented token is
    /// consumed; presenting it again fails as reused.
    #[instrument(skip(self, presented))]
    pub async fn refresh(&self, presented: &str) -> Result<SessionGrant> {
        let claims = match self.tokens.validate_refresh(presented) {
            Ok(claims) => claims,
            Err(err) => {
                metrics::record_refresh("invalid").await;
                return Err(CampusError::from(err));
            }
        };

        let Some(identity) = self.repository.find_credentials_by_email(&claims.sub).await? else {
            metrics::record_refresh("unknown_subject").await;
            return Err(CampusError::not_found("identity", claims.sub));
        };

        let tokens = self.tokens.issue_pair(&claims.sub)?;

        match self
            .repository
            .rotate_refresh_token(&identity.id, presented, &tokens.refresh_token)
            .await?
        {
            RotationOutcome::Rotated => {
                metrics::record_refresh("success").await;
                info!(user_id = %identity.id, "refresh token rotated");
                Ok(SessionGrant { user_id: identity.id, role: identity.role, tokens })
            }
            RotationOutcome::Stale => {
                warn!(
                    security_event = "refresh_token_reused",
                    user_id = %identity.id,
                    "refresh token presented after rotation"
                );
                metrics::record_refresh("reused").await;
                metrics::record_refresh_reuse().await;
                Err(CampusError::auth(
                    "Refresh token has already been used",
                    AuthErrorType::ReusedToken,
                ))
            }
            RotationOutcome::Missing => {
                metrics::record_refresh("missing_session").await;
                Err(CampusError::not_found("session", identity.id.to_string()))
            }
        }
    }

    /// Revoke the identity's refresh token.
    #[instrument(skip(self))]
    pub async fn logout(&self, user_id: &UserId) -> Result<()> {
        self.repository.set_refresh_token(user_id, "").await?;
        info!(user_id = %user_id, "session revoked");
        Ok(())
    }

    /// Build a secure HTTP-only cookie carrying the refresh token
    pub fn build_refresh_cookie(&self, refresh_token: &str) -> SessionCookie {
        SessionCookie {
            name: REFRESH_COOKIE_NAME.to_string(),
            value: refresh_token.to_string(),
            max_age: self.tokens.refresh_ttl(),
            http_only: true,
            secure: self.cookie_secure,
            same_site: SameSitePolicy::Strict,
            path: self.cookie_path.clone(),
        }
    }

    /// Cookie that makes the client drop its refresh token
    pub fn clear_refresh_cookie(&self) -> SessionCookie {
        SessionCookie { value: String::new(), max_age: Duration::ZERO, ..self.build_refresh_cookie("") }
    }
}

fn invalid_credentials() -> CampusError {
    CampusError::auth("Invalid email or password", AuthErrorType::InvalidCredentials)
}
