use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::routes::ApiState;
use crate::auth::models::{AuthContext, Role};
use crate::auth::user::{UpdateProfileRequest, User};
use crate::domain::UserId;

const DEFAULT_PAGE_SIZE: i64 = 50;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListUsersQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRoleResponse {
    pub id: UserId,
    pub role: Role,
}

pub(crate) fn parse_user_id(raw: &str) -> Result<UserId, ApiError> {
    UserId::parse(raw).map_err(|_| ApiError::bad_request("Invalid user id"))
}

pub async fn get_me_handler(
    State(state): State<ApiState>,
    Extension(context): Extension<AuthContext>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.users.get_user(&context.user_id).await?))
}

pub async fn update_me_handler(
    State(state): State<ApiState>,
    Extension(context): Extension<AuthContext>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.users.update_profile(&context.user_id, payload).await?))
}

pub async fn list_users_handler(
    State(state): State<ApiState>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<Vec<User>>, ApiError> {
    let users = state
        .users
        .list_users(query.limit.unwrap_or(DEFAULT_PAGE_SIZE), query.offset.unwrap_or(0))
        .await?;
    Ok(Json(users))
}

pub async fn get_user_handler(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let id = parse_user_id(&user_id)?;
    Ok(Json(state.users.get_user(&id).await?))
}

pub async fn update_user_handler(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<User>, ApiError> {
    let id = parse_user_id(&user_id)?;
    Ok(Json(state.users.update_profile(&id, payload).await?))
}

pub async fn delete_user_handler(
    State(state): State<ApiState>,
    Extension(context): Extension<AuthContext>,
    Path(user_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_user_id(&user_id)?;
    state.users.delete_user(&context.user_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_user_role_handler(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserRoleResponse>, ApiError> {
    let id = parse_user_id(&user_id)?;
    let role = state.users.role_of(&id).await?;
    Ok(Json(UserRoleResponse { id, role }))
}
