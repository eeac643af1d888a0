use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::error::ApiError;
use crate::api::routes::ApiState;
use crate::auth::models::{AuthContext, Role};
use crate::auth::session::{SameSitePolicy, SessionCookie, SessionGrant, REFRESH_COOKIE_NAME};
use crate::auth::user::{LoginRequest, RegisterRequest};
use crate::domain::UserId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponseBody {
    pub access_token: String,
    pub id: UserId,
    pub role: Role,
}

/// Response wrapper that includes both JSON body and Set-Cookie header
pub struct SessionIssuedResponse {
    status: StatusCode,
    body: AuthResponseBody,
    cookie: Cookie<'static>,
}

impl IntoResponse for SessionIssuedResponse {
    fn into_response(self) -> Response {
        let response = (self.status, Json(self.body)).into_response();
        with_cookie(response, &self.cookie)
    }
}

/// Error response that also drops the client's refresh cookie
pub struct RefreshRejected {
    error: ApiError,
    cookie: Cookie<'static>,
}

impl IntoResponse for RefreshRejected {
    fn into_response(self) -> Response {
        with_cookie(self.error.into_response(), &self.cookie)
    }
}

fn with_cookie(mut response: Response, cookie: &Cookie<'static>) -> Response {
    if let Ok(cookie_value) = cookie.to_string().parse() {
        response.headers_mut().append(header::SET_COOKIE, cookie_value);
    }
    response
}

pub(crate) fn to_http_cookie(cookie: SessionCookie) -> Cookie<'static> {
    let same_site = match cookie.same_site {
        SameSitePolicy::Strict => SameSite::Strict,
        SameSitePolicy::Lax => SameSite::Lax,
        SameSitePolicy::None => SameSite::None,
    };
    let max_age = i64::try_from(cookie.max_age.as_secs()).unwrap_or(i64::MAX);

    Cookie::build((cookie.name, cookie.value))
        .path(cookie.path)
        .http_only(cookie.http_only)
        .secure(cookie.secure)
        .same_site(same_site)
        .max_age(time::Duration::seconds(max_age))
        .build()
}

fn issued(state: &ApiState, status: StatusCode, grant: SessionGrant) -> SessionIssuedResponse {
    let cookie = to_http_cookie(state.sessions.build_refresh_cookie(&grant.tokens.refresh_token));
    SessionIssuedResponse {
        status,
        body: AuthResponseBody {
            access_token: grant.tokens.access_token,
            id: grant.user_id,
            role: grant.role,
        },
        cookie,
    }
}

pub async fn signup_handler(
    State(state): State<ApiState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<SessionIssuedResponse, ApiError> {
    let grant = state.sessions.register(payload).await?;
    Ok(issued(&state, StatusCode::CREATED, grant))
}

pub async fn signin_handler(
    State(state): State<ApiState>,
    Json(payload): Json<LoginRequest>,
) -> Result<SessionIssuedResponse, ApiError> {
    let grant = state.sessions.login(&payload).await?;
    Ok(issued(&state, StatusCode::OK, grant))
}

/// Rotate the refresh cookie. Any failure answers 401 and clears the cookie.
pub async fn refresh_handler(
    State(state): State<ApiState>,
    jar: CookieJar,
) -> Result<SessionIssuedResponse, RefreshRejected> {
    let rejected = |state: &ApiState| RefreshRejected {
        error: ApiError::unauthorized("Unauthorized"),
        cookie: to_http_cookie(state.sessions.clear_refresh_cookie()),
    };

    let Some(presented) = jar.get(REFRESH_COOKIE_NAME).map(|c| c.value().to_string()) else {
        return Err(rejected(&state));
    };
    if presented.is_empty() {
        return Err(rejected(&state));
    }

    match state.sessions.refresh(&presented).await {
        Ok(grant) => Ok(issued(&state, StatusCode::OK, grant)),
        Err(err) => {
            debug!(error = %err, "refresh rejected");
            Err(rejected(&state))
        }
    }
}

pub async fn logout_handler(
    State(state): State<ApiState>,
    Extension(context): Extension<AuthContext>,
) -> Result<Response, ApiError> {
    state.sessions.logout(&context.user_id).await?;
    let cookie = to_http_cookie(state.sessions.clear_refresh_cookie());
    Ok(with_cookie(StatusCode::NO_CONTENT.into_response(), &cookie))
}
