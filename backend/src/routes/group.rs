//! Group route definitions

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::handlers::group::{create_group, get_group, set_group_status, set_signatories};
use crate::state::AppState;

pub fn group_routes() -> Router<AppState> {
    Router::new()
        .route("/api/groups", post(create_group))
        .route("/api/groups/:id", get(get_group))
        .route("/api/groups/:id/signatories", put(set_signatories))
        .route("/api/groups/:id/status", put(set_group_status))
}
