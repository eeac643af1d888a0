//! Course enrollment lookups used by the enrollment gate.

use crate::auth::models::CourseEnrollment;
use crate::domain::{CourseId, EnrollmentId, UserId};
use crate::errors::types::is_unique_violation;
use crate::errors::{CampusError, Result};
use crate::storage::DbPool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tracing::instrument;

#[derive(Debug, Clone, FromRow)]
struct EnrollmentRow {
    pub id: EnrollmentId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub progress: i32,
    pub created_at: DateTime<Utc>,
}

impl From<EnrollmentRow> for CourseEnrollment {
    fn from(row: EnrollmentRow) -> Self {
        CourseEnrollment {
            id: row.id,
            user_id: row.user_id,
            course_id: row.course_id,
            progress: row.progress,
            created_at: row.created_at,
        }
    }
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db_err| db_err.code())
        .map(|code| code.as_ref() == "23503")
        .unwrap_or(false)
}

#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    async fn find_enrollment(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<Option<CourseEnrollment>>;

    async fn has_enrollment(&self, user_id: &UserId, course_id: &CourseId) -> Result<bool> {
        Ok(self.find_enrollment(user_id, course_id).await?.is_some())
    }

    /// Enroll an identity. Unknown user or course is NotFound; a repeat is a Conflict.
    async fn enroll(&self, user_id: &UserId, course_id: &CourseId) -> Result<CourseEnrollment>;
}

#[derive(Debug, Clone)]
pub struct SqlxEnrollmentRepository {
    pool: DbPool,
}

impl SqlxEnrollmentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EnrollmentRepository for SqlxEnrollmentRepository {
    #[instrument(skip(self), fields(user_id = %user_id, course_id = %course_id), name = "db_find_enrollment")]
    async fn find_enrollment(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<Option<CourseEnrollment>> {
        let row = sqlx::query_as::<_, EnrollmentRow>(
            "SELECT id, user_id, course_id, progress, created_at FROM course_enrollments \
             WHERE user_id = $1 AND course_id = $2",
        )
        .bind(*user_id)
        .bind(*course_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CampusError::database(e, "Failed to fetch enrollment"))?;

        Ok(row.map(CourseEnrollment::from))
    }

    #[instrument(skip(self), fields(user_id = %user_id, course_id = %course_id), name = "db_enroll")]
    async fn enroll(&self, user_id: &UserId, course_id: &CourseId) -> Result<CourseEnrollment> {
        let row = sqlx::query_as::<_, EnrollmentRow>(
            "INSERT INTO course_enrollments (id, user_id, course_id, progress) VALUES ($1, $2, $3, 0) \
             RETURNING id, user_id, course_id, progress, created_at",
        )
        .bind(EnrollmentId::new())
        .bind(*user_id)
        .bind(*course_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                CampusError::conflict("Identity is already enrolled in this course", "enrollment")
            } else if is_foreign_key_violation(&e) {
                CampusError::not_found("course or identity", format!("{}/{}", course_id, user_id))
            } else {
                CampusError::database(e, "Failed to create enrollment")
            }
        })?;

        Ok(row.into())
    }
}
