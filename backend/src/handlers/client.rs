//! Client and savings handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::AuthenticatedUser;
use crate::client::{Client, ClientQuery, CreateClientRequest};
use crate::error::ApiError;
use crate::models::PaginatedResponse;
use crate::savings::{AdjustSavingsRequest, DepositRequest, SavingsTransaction};
use crate::state::AppState;

/// POST /api/clients
pub async fn create_client(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<CreateClientRequest>,
) -> Result<(StatusCode, Json<Client>), ApiError> {
    let client = state.client_service.create(user.actor(), req).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

/// GET /api/clients
pub async fn list_clients(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(query): Query<ClientQuery>,
) -> Result<Json<PaginatedResponse<Client>>, ApiError> {
    let clients = state.client_service.list(query).await?;
    Ok(Json(clients))
}

/// GET /api/clients/:id
pub async fn get_client(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(client_id): Path<Uuid>,
) -> Result<Json<Client>, ApiError> {
    let client = state.client_service.get(client_id).await?;
    Ok(Json(client))
}

/// POST /api/clients/:id/savings - add-only deposit
pub async fn deposit_savings(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(client_id): Path<Uuid>,
    Json(req): Json<DepositRequest>,
) -> Result<(StatusCode, Json<SavingsTransaction>), ApiError> {
    let entry = state
        .savings_service
        .deposit(user.actor(), client_id, req)
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// GET /api/clients/:id/savings
pub async fn savings_history(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(client_id): Path<Uuid>,
) -> Result<Json<Vec<SavingsTransaction>>, ApiError> {
    state.client_service.get(client_id).await?;
    let history = state.savings_service.history(client_id).await?;
    Ok(Json(history))
}

/// POST /api/savings - signed add or deduct
pub async fn adjust_savings(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<AdjustSavingsRequest>,
) -> Result<(StatusCode, Json<SavingsTransaction>), ApiError> {
    let entry = state.savings_service.adjust(user.actor(), req).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}
