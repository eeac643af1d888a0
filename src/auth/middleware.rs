//! Axum middleware for authentication and authorization.
//!
//! Layer order matters: [`authenticate`] must run before [`require_admin`]
//! and [`require_enrollment`], which read the [`AuthContext`] it attaches.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Extension, Path, State},
    http::{header::AUTHORIZATION, Method, Request},
    middleware::Next,
    response::Response,
};
use tracing::{field, info_span, warn, Instrument};

use crate::api::error::ApiError;
use crate::auth::auth_service::AuthService;
use crate::auth::models::{AuthContext, AuthError};
use crate::domain::CourseId;
use crate::storage::repositories::EnrollmentRepository;

pub type AuthServiceState = Arc<AuthService>;
pub type EnrollmentState = Arc<dyn EnrollmentRepository>;

/// Path parameter naming the course behind an enrollment-gated route
pub const COURSE_ID_PARAM: &str = "course_id";

/// Middleware entry point that authenticates requests using the configured [`AuthService`].
pub async fn authenticate(
    State(auth_service): State<AuthServiceState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if request.method() == Method::OPTIONS {
        return Ok(next.run(request).await);
    }

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let correlation_id = uuid::Uuid::new_v4();
    let span = info_span!(
        "auth_middleware.authenticate",
        http.method = %method,
        http.path = %path,
        auth.user_id = field::Empty,
        correlation_id = %correlation_id
    );

    let header =
        request.headers().get(AUTHORIZATION).and_then(|value| value.to_str().ok()).unwrap_or("");

    match auth_service.authenticate(header).instrument(span.clone()).await {
        Ok(context) => {
            span.record("auth.user_id", field::display(&context.user_id));
            request.extensions_mut().insert(context);
            Ok(next.run(request).instrument(span).await)
        }
        Err(err) => {
            span.in_scope(|| warn!(%correlation_id, error = %err, "authentication failed"));
            Err(map_auth_error(err))
        }
    }
}

/// Role gate: only administrators pass.
pub async fn require_admin(
    Extension(context): Extension<AuthContext>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if context.is_admin() {
        return Ok(next.run(request).await);
    }

    warn!(
        user_id = %context.user_id,
        role = %context.role,
        path = %request.uri().path(),
        "role check failed"
    );
    Err(map_auth_error(AuthError::Forbidden))
}

/// Resource gate: the caller must be enrolled in the course named by the
/// `{course_id}` path segment. The enrollment is attached to the request.
pub async fn require_enrollment(
    State(enrollments): State<EnrollmentState>,
    Extension(context): Extension<AuthContext>,
    Path(params): Path<HashMap<String, String>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let course_id = params
        .get(COURSE_ID_PARAM)
        .and_then(|raw| CourseId::parse(raw).ok())
        .ok_or_else(|| ApiError::bad_request("Invalid course id"))?;

    let enrollment = enrollments
        .find_enrollment(&context.user_id, &course_id)
        .await
        .map_err(|err| map_auth_error(AuthError::Persistence(err)))?;

    match enrollment {
        Some(enrollment) => {
            request.extensions_mut().insert(enrollment);
            Ok(next.run(request).await)
        }
        None => {
            warn!(user_id = %context.user_id, course_id = %course_id, "enrollment check failed");
            Err(map_auth_error(AuthError::Forbidden))
        }
    }
}

fn map_auth_error(err: AuthError) -> ApiError {
    ApiError::from(err)
}
