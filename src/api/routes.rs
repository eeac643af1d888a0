use std::sync::Arc;

use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::auth::{
    auth_service::AuthService,
    jwt::TokenIssuer,
    middleware::{authenticate, require_admin, require_enrollment, EnrollmentState},
    session::SessionService,
    user_service::UserService,
};
use crate::config::{AuthConfig, ServerConfig};
use crate::errors::Result;
use crate::storage::{DbPool, EnrollmentRepository, SqlxEnrollmentRepository};

use super::handlers::{
    delete_user_handler, enroll_handler, get_enrollment_handler, get_me_handler,
    get_user_handler, get_user_role_handler, health_handler, list_users_handler, logout_handler,
    refresh_handler, signin_handler, signup_handler, update_me_handler, update_user_handler,
};

#[derive(Clone)]
pub struct ApiState {
    pub auth: Arc<AuthService>,
    pub sessions: Arc<SessionService>,
    pub users: Arc<UserService>,
    pub enrollments: Arc<dyn EnrollmentRepository>,
}

impl ApiState {
    pub fn with_sqlx(pool: DbPool, config: &AuthConfig) -> Result<Self> {
        let tokens = Arc::new(TokenIssuer::from_config(config));
        Ok(Self {
            auth: Arc::new(AuthService::with_sqlx(pool.clone(), tokens.clone())),
            sessions: Arc::new(SessionService::with_sqlx(pool.clone(), tokens, config)?),
            users: Arc::new(UserService::with_sqlx(pool.clone())),
            enrollments: Arc::new(SqlxEnrollmentRepository::new(pool)),
        })
    }
}

pub fn build_router(state: ApiState, server: &ServerConfig) -> Router {
    let auth_layer = middleware::from_fn_with_state(state.auth.clone(), authenticate);
    let enrollment_state: EnrollmentState = state.enrollments.clone();

    let public = Router::new()
        .route("/api/v1/auth/signup", post(signup_handler))
        .route("/api/v1/auth/signin", post(signin_handler))
        .route("/api/v1/auth/refresh", post(refresh_handler));

    let admin = Router::new()
        .route("/api/v1/users", get(list_users_handler))
        .route(
            "/api/v1/users/{user_id}",
            get(get_user_handler).put(update_user_handler).delete(delete_user_handler),
        )
        .route("/api/v1/users/{user_id}/role", get(get_user_role_handler))
        .route("/api/v1/courses/{course_id}/enrollments", post(enroll_handler))
        .route_layer(middleware::from_fn(require_admin));

    let enrolled = Router::new()
        .route("/api/v1/courses/{course_id}/enrollment", get(get_enrollment_handler))
        .route_layer(middleware::from_fn_with_state(enrollment_state, require_enrollment));

    let secured = Router::new()
        .route("/api/v1/auth/logout", post(logout_handler))
        .route("/api/v1/users/me", get(get_me_handler).put(update_me_handler))
        .merge(admin)
        .merge(enrolled)
        .route_layer(auth_layer);

    let mut router = Router::new()
        .merge(public)
        .merge(secured)
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if server.enable_cors {
        router = router.layer(cors_layer(&server.cors_origins));
    }

    router
}

/// Empty origin list allows any origin without credentials; an explicit
/// list allows credentials so the refresh cookie is sent cross-origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS]);

    if origins.is_empty() {
        return base.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    base.allow_origin(allowed).allow_credentials(true)
}
