//! Audit log, portfolio and health handlers

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use super::AuthenticatedUser;
use crate::audit::{AuditEntry, AuditQuery};
use crate::db;
use crate::error::ApiError;
use crate::models::PaginatedResponse;
use crate::services::PortfolioSummary;
use crate::state::AppState;
use crate::workflow::Permission;

/// GET /api/audit-logs
pub async fn list_audit_logs(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<AuditQuery>,
) -> Result<Json<PaginatedResponse<AuditEntry>>, ApiError> {
    user.require(Permission::ViewAuditLog)?;
    let entries = state.audit_service.list(query).await?;
    Ok(Json(entries))
}

/// GET /api/analytics/portfolio
pub async fn portfolio_summary(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<PortfolioSummary>, ApiError> {
    user.require(Permission::ViewLoans)?;
    let summary = state.analytics_service.portfolio().await?;
    Ok(Json(summary))
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    database: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<db::DbHealth>,
    version: &'static str,
}

/// GET /health - 503 while the database is unreachable
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (status, code, database, details) = match db::check_health(&state.db_pool).await {
        Ok(health) => ("healthy", StatusCode::OK, "connected".to_string(), Some(health)),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            (
                "unhealthy",
                StatusCode::SERVICE_UNAVAILABLE,
                format!("error: {}", e),
                None,
            )
        }
    };

    (
        code,
        Json(HealthResponse {
            status,
            database,
            details,
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}
