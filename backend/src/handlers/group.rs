//! Group handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::AuthenticatedUser;
use crate::error::ApiError;
use crate::group::{CreateGroupRequest, GroupDetail, SetGroupStatusRequest, Signatories};
use crate::state::AppState;

/// POST /api/groups
pub async fn create_group(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<GroupDetail>), ApiError> {
    let group = state.group_service.create(user.actor(), req).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

/// GET /api/groups/:id
pub async fn get_group(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(group_id): Path<Uuid>,
) -> Result<Json<GroupDetail>, ApiError> {
    let group = state.group_service.get(group_id).await?;
    Ok(Json(group))
}

/// PUT /api/groups/:id/signatories
pub async fn set_signatories(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(group_id): Path<Uuid>,
    Json(req): Json<Signatories>,
) -> Result<Json<GroupDetail>, ApiError> {
    let group = state
        .group_service
        .set_signatories(user.actor(), group_id, req)
        .await?;
    Ok(Json(group))
}

/// PUT /api/groups/:id/status
pub async fn set_group_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(group_id): Path<Uuid>,
    Json(req): Json<SetGroupStatusRequest>,
) -> Result<Json<GroupDetail>, ApiError> {
    let group = state
        .group_service
        .set_status(user.actor(), group_id, req.status)
        .await?;
    Ok(Json(group))
}
