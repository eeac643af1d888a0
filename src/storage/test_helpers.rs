//! In-memory repository doubles for in-library tests.
//!
//! They mirror the PostgreSQL semantics the services rely on: case-sensitive
//! unique email, all-or-nothing registration, cascade on delete and a
//! compare-and-swap refresh rotation performed under a single lock.
//!
//! This module is only available in test builds (`#[cfg(test)]`).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::auth::models::CourseEnrollment;
use crate::auth::user::{Identity, NewIdentity, UpdateProfileRequest, User};
use crate::domain::{CourseId, EnrollmentId, UserId};
use crate::errors::{CampusError, Result};
use crate::storage::repositories::{CredentialRepository, EnrollmentRepository, RotationOutcome};

#[derive(Debug, Clone)]
struct StoredIdentity {
    identity: Identity,
    user: User,
    refresh_token: String,
}

#[derive(Default)]
pub struct InMemoryCredentialRepository {
    identities: Mutex<HashMap<UserId, StoredIdentity>>,
}

impl InMemoryCredentialRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self) -> usize {
        self.identities.lock().await.len()
    }
}

#[async_trait]
impl CredentialRepository for InMemoryCredentialRepository {
    async fn create_identity(&self, new: NewIdentity) -> Result<User> {
        let mut identities = self.identities.lock().await;
        if identities.values().any(|s| s.user.profile.email == new.profile.email) {
            return Err(CampusError::conflict("Email is already registered", "profile"));
        }

        let user =
            User { id: new.id, role: new.role, profile: new.profile, created_at: Utc::now() };
        identities.insert(
            new.id,
            StoredIdentity {
                identity: Identity { id: new.id, password_hash: new.password_hash, role: new.role },
                user: user.clone(),
                refresh_token: new.refresh_token,
            },
        );
        Ok(user)
    }

    async fn find_credentials_by_email(&self, email: &str) -> Result<Option<Identity>> {
        let identities = self.identities.lock().await;
        Ok(identities
            .values()
            .find(|s| s.user.profile.email == email)
            .map(|s| s.identity.clone()))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let identities = self.identities.lock().await;
        Ok(identities.values().find(|s| s.user.profile.email == email).map(|s| s.user.clone()))
    }

    async fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        Ok(self.identities.lock().await.get(id).map(|s| s.user.clone()))
    }

    async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<User>> {
        let identities = self.identities.lock().await;
        let mut users: Vec<User> = identities.values().map(|s| s.user.clone()).collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(users.into_iter().skip(offset.max(0) as usize).take(limit.max(0) as usize).collect())
    }

    async fn update_profile(&self, id: &UserId, changes: UpdateProfileRequest) -> Result<User> {
        let mut identities = self.identities.lock().await;
        let stored = identities
            .get_mut(id)
            .ok_or_else(|| CampusError::not_found("identity", id.to_string()))?;
        let email = std::mem::take(&mut stored.user.profile.email);
        stored.user.profile = changes.into_profile(email);
        Ok(stored.user.clone())
    }

    async fn delete_identity(&self, id: &UserId) -> Result<()> {
        self.identities
            .lock()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| CampusError::not_found("identity", id.to_string()))
    }

    async fn set_refresh_token(&self, id: &UserId, token: &str) -> Result<()> {
        let mut identities = self.identities.lock().await;
        let stored = identities
            .get_mut(id)
            .ok_or_else(|| CampusError::not_found("session", id.to_string()))?;
        stored.refresh_token = token.to_string();
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        id: &UserId,
        presented: &str,
        replacement: &str,
    ) -> Result<RotationOutcome> {
        let mut identities = self.identities.lock().await;
        let Some(stored) = identities.get_mut(id) else {
            return Ok(RotationOutcome::Missing);
        };
        if stored.refresh_token.is_empty() || stored.refresh_token != presented {
            return Ok(RotationOutcome::Stale);
        }
        stored.refresh_token = replacement.to_string();
        Ok(RotationOutcome::Rotated)
    }

    async fn get_refresh_token(&self, id: &UserId) -> Result<Option<String>> {
        Ok(self.identities.lock().await.get(id).map(|s| s.refresh_token.clone()))
    }
}

#[derive(Default)]
pub struct InMemoryEnrollmentRepository {
    enrollments: Mutex<Vec<CourseEnrollment>>,
}

impl InMemoryEnrollmentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryEnrollmentRepository {
    async fn find_enrollment(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<Option<CourseEnrollment>> {
        let enrollments = self.enrollments.lock().await;
        Ok(enrollments
            .iter()
            .find(|e| &e.user_id == user_id && &e.course_id == course_id)
            .cloned())
    }

    async fn enroll(&self, user_id: &UserId, course_id: &CourseId) -> Result<CourseEnrollment> {
        let mut enrollments = self.enrollments.lock().await;
        if enrollments.iter().any(|e| &e.user_id == user_id && &e.course_id == course_id) {
            return Err(CampusError::conflict(
                "Identity is already enrolled in this course",
                "enrollment",
            ));
        }
        let enrollment = CourseEnrollment {
            id: EnrollmentId::new(),
            user_id: *user_id,
            course_id: *course_id,
            progress: 0,
            created_at: Utc::now(),
        };
        enrollments.push(enrollment.clone());
        Ok(enrollment)
    }
}
