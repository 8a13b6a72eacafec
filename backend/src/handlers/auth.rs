//! Authentication HTTP handlers
//!
//! Email and password login issuing JWT access/refresh pairs.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    Json,
};
use serde::Serialize;
use validator::Validate;

use super::AuthenticatedUser;
use crate::error::ApiError;
use crate::models::{AuthTokensResponse, LoginRequest, RefreshTokenRequest, UserResponse};
use crate::state::AppState;
use crate::workflow::{Permission, Policy};

/// Current user with the permissions their role grants
#[derive(Debug, Serialize)]
pub struct CurrentUserResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub permissions: Vec<Permission>,
}

/// POST /auth/login - Check credentials and issue tokens
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthTokensResponse>, ApiError> {
    req.validate()?;

    let ip_address = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string());
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());

    let tokens = state
        .auth_service
        .login(&req.email, &req.password, ip_address, user_agent)
        .await?;

    Ok(Json(tokens))
}

/// POST /auth/refresh - Rotate the refresh token
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(req): Json<RefreshTokenRequest>,
) -> Result<Json<AuthTokensResponse>, ApiError> {
    let tokens = state.auth_service.refresh_tokens(&req.refresh_token).await?;
    Ok(Json(tokens))
}

/// POST /auth/logout - Revoke current session
pub async fn logout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<StatusCode, ApiError> {
    state.auth_service.revoke_session(&user.jti).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /auth/me - Get current authenticated user
pub async fn get_current_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<CurrentUserResponse>, ApiError> {
    let user = state.auth_service.get_user_by_id(user.user_id).await?;
    let permissions = Policy::permissions_of(user.role);
    Ok(Json(CurrentUserResponse {
        user: user.into(),
        permissions,
    }))
}
