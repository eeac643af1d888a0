//! Identity administration: listing, profile edits, role lookup and removal.
//!
//! Authorization is decided by the caller (router gates); the service only
//! enforces data rules such as "an administrator cannot delete themselves".

use std::sync::Arc;

use tracing::{info, instrument};

use crate::auth::models::Role;
use crate::auth::user::{UpdateProfileRequest, User};
use crate::auth::user_validation::{CredentialValidator, RegexCredentialValidator};
use crate::domain::UserId;
use crate::errors::{CampusError, Result};
use crate::storage::repositories::{CredentialRepository, SqlxCredentialRepository};

/// Upper bound on a single page of users
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Clone)]
pub struct UserService {
    repository: Arc<dyn CredentialRepository>,
    validator: Arc<dyn CredentialValidator>,
}

impl UserService {
    pub fn new(
        repository: Arc<dyn CredentialRepository>,
        validator: Arc<dyn CredentialValidator>,
    ) -> Self {
        Self { repository, validator }
    }

    pub fn with_sqlx(pool: crate::storage::DbPool) -> Self {
        Self::new(Arc::new(SqlxCredentialRepository::new(pool)), Arc::new(RegexCredentialValidator))
    }

    /// List users oldest first. `limit` is clamped to `1..=MAX_PAGE_SIZE`.
    pub async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<User>> {
        self.repository.list_users(limit.clamp(1, MAX_PAGE_SIZE), offset.max(0)).await
    }

    pub async fn get_user(&self, id: &UserId) -> Result<User> {
        self.repository
            .get_user(id)
            .await?
            .ok_or_else(|| CampusError::not_found("user", id.to_string()))
    }

    /// Replace the editable profile fields of `id`. The email never changes.
    #[instrument(skip(self, request), fields(user_id = %id))]
    pub async fn update_profile(&self, id: &UserId, request: UpdateProfileRequest) -> Result<User> {
        let current = self.get_user(id).await?;
        self.validator.check_profile(&request.clone().into_profile(current.profile.email))?;
        let user = self.repository.update_profile(id, request).await?;
        info!(user_id = %user.id, "profile updated");
        Ok(user)
    }

    /// Remove an identity together with its profile, session and enrollments.
    #[instrument(skip(self), fields(actor = %actor, user_id = %id))]
    pub async fn delete_user(&self, actor: &UserId, id: &UserId) -> Result<()> {
        if actor == id {
            return Err(CampusError::validation_field("Cannot delete your own account", "user_id"));
        }
        self.repository.delete_identity(id).await?;
        info!(user_id = %id, "identity deleted");
        Ok(())
    }

    pub async fn role_of(&self, id: &UserId) -> Result<Role> {
        Ok(self.get_user(id).await?.role)
    }
}
