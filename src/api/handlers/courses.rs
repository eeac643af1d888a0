use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::routes::ApiState;
use crate::auth::models::CourseEnrollment;
use crate::domain::{CourseId, UserId};
use crate::storage::repositories::EnrollmentRepository;

#[derive(Debug, Clone, Deserialize)]
pub struct EnrollRequest {
    pub user_id: UserId,
}

pub async fn enroll_handler(
    State(state): State<ApiState>,
    Path(course_id): Path<String>,
    Json(payload): Json<EnrollRequest>,
) -> Result<(StatusCode, Json<CourseEnrollment>), ApiError> {
    let course_id =
        CourseId::parse(&course_id).map_err(|_| ApiError::bad_request("Invalid course id"))?;
    let enrollment = state.enrollments.enroll(&payload.user_id, &course_id).await?;
    Ok((StatusCode::CREATED, Json(enrollment)))
}

/// The enrollment gate has already loaded the row.
pub async fn get_enrollment_handler(
    Extension(enrollment): Extension<CourseEnrollment>,
) -> Json<CourseEnrollment> {
    Json(enrollment)
}
