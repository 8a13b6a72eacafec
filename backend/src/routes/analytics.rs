//! Audit log and portfolio route definitions

use axum::{routing::get, Router};

use crate::handlers::analytics::{list_audit_logs, portfolio_summary};
use crate::state::AppState;

pub fn analytics_routes() -> Router<AppState> {
    Router::new()
        .route("/api/audit-logs", get(list_audit_logs))
        .route("/api/analytics/portfolio", get(portfolio_summary))
}
