//! Staff user handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::AuthenticatedUser;
use crate::error::ApiError;
use crate::models::{CreateUserRequest, PaginatedResponse, PaginationParams, UserResponse};
use crate::state::AppState;

/// POST /api/users
pub async fn create_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let created = state.user_service.create(user.actor(), req).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/users
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<PaginatedResponse<UserResponse>>, ApiError> {
    let users = state.user_service.list(user.actor(), pagination).await?;
    Ok(Json(users))
}

/// DELETE /api/users/:id
pub async fn deactivate_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.user_service.deactivate(user.actor(), user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
