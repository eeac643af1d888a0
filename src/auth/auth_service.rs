//! Resolves a bearer access token to the identity it was issued for.

use std::sync::Arc;

use tracing::{field, info, instrument};

use crate::auth::jwt::{TokenError, TokenIssuer};
use crate::auth::models::{AuthContext, AuthError};
use crate::observability::metrics;
use crate::storage::repositories::{CredentialRepository, SqlxCredentialRepository};

#[derive(Clone)]
pub struct AuthService {
    repository: Arc<dyn CredentialRepository>,
    tokens: Arc<TokenIssuer>,
}

impl AuthService {
    pub fn new(repository: Arc<dyn CredentialRepository>, tokens: Arc<TokenIssuer>) -> Self {
        Self { repository, tokens }
    }

    pub fn with_sqlx(pool: crate::storage::DbPool, tokens: Arc<TokenIssuer>) -> Self {
        Self::new(Arc::new(SqlxCredentialRepository::new(pool)), tokens)
    }

    /// Authenticate an `Authorization` header value of the form `Bearer <token>`.
    #[instrument(skip(self, header), fields(user_id = field::Empty))]
    pub async fn authenticate(&self, header: &str) -> Result<AuthContext, AuthError> {
        let header = header.trim();
        if header.is_empty() {
            metrics::record_authentication("missing_bearer").await;
            return Err(AuthError::MissingBearer);
        }

        let mut parts = header.split(' ');
        let token = match (parts.next(), parts.next(), parts.next()) {
            (Some("Bearer"), Some(token), None) if !token.is_empty() => token,
            _ => {
                metrics::record_authentication("malformed").await;
                return Err(AuthError::MalformedBearer);
            }
        };

        let claims = match self.tokens.validate_access(token) {
            Ok(claims) => claims,
            Err(err) => {
                let status = match err {
                    TokenError::Expired => "expired",
                    _ => "invalid",
                };
                metrics::record_authentication(status).await;
                return Err(AuthError::InvalidToken);
            }
        };

        let user = match self.repository.find_user_by_email(&claims.sub).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                metrics::record_authentication("unknown_subject").await;
                return Err(AuthError::UnknownSubject);
            }
            Err(err) => {
                metrics::record_authentication("error").await;
                return Err(AuthError::from(err));
            }
        };

        tracing::Span::current().record("user_id", field::display(&user.id));
        metrics::record_authentication("success").await;
        info!(user_id = %user.id, role = %user.role, "access token authenticated");

        Ok(AuthContext::new(user.id, user.profile.email, user.role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::test_issuer;
    use crate::auth::models::Role;
    use crate::auth::user::{sample_profile, NewIdentity};
    use crate::domain::UserId;
    use crate::storage::test_helpers::InMemoryCredentialRepository;

    async fn setup() -> (AuthService, Arc<TokenIssuer>, Arc<InMemoryCredentialRepository>, UserId) {
        let repository = Arc::new(InMemoryCredentialRepository::new());
        let tokens = Arc::new(test_issuer());
        let id = UserId::new();
        repository
            .create_identity(NewIdentity {
                id,
                password_hash: "unused".into(),
                role: Role::Administrator,
                profile: sample_profile("admin@example.com"),
                refresh_token: String::new(),
            })
            .await
            .unwrap();
        (AuthService::new(repository.clone(), tokens.clone()), tokens, repository, id)
    }

    #[tokio::test]
    async fn valid_bearer_resolves_identity() {
        let (service, tokens, _, id) = setup().await;
        let pair = tokens.issue_pair("admin@example.com").unwrap();

        let ctx = service.authenticate(&format!("Bearer {}", pair.access_token)).await.unwrap();
        assert_eq!(ctx.user_id, id);
        assert_eq!(ctx.email, "admin@example.com");
        assert_eq!(ctx.role, Role::Administrator);
    }

    #[tokio::test]
    async fn header_shape_is_checked() {
        let (service, tokens, _, _) = setup().await;
        let access = tokens.issue_pair("admin@example.com").unwrap().access_token;

        assert!(matches!(service.authenticate("").await, Err(AuthError::MissingBearer)));
        assert!(matches!(service.authenticate(&access).await, Err(AuthError::MalformedBearer)));
        assert!(matches!(
            service.authenticate(&format!("Token {}", access)).await,
            Err(AuthError::MalformedBearer)
        ));
        assert!(matches!(
            service.authenticate(&format!("Bearer {} extra", access)).await,
            Err(AuthError::MalformedBearer)
        ));
    }

    #[tokio::test]
    async fn refresh_token_is_not_an_access_token() {
        let (service, tokens, _, _) = setup().await;
        let refresh = tokens.issue_pair("admin@example.com").unwrap().refresh_token;

        let result = service.authenticate(&format!("Bearer {}", refresh)).await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn deleted_identity_is_unknown_subject() {
        let (service, tokens, repository, id) = setup().await;
        let access = tokens.issue_pair("admin@example.com").unwrap().access_token;
        repository.delete_identity(&id).await.unwrap();

        let result = service.authenticate(&format!("Bearer {}", access)).await;
        assert!(matches!(result, Err(AuthError::UnknownSubject)));
    }
}
