//! Client and savings route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::client::{
    adjust_savings, create_client, deposit_savings, get_client, list_clients, savings_history,
};
use crate::state::AppState;

pub fn client_routes() -> Router<AppState> {
    Router::new()
        .route("/api/clients", get(list_clients).post(create_client))
        .route("/api/clients/:id", get(get_client))
        .route(
            "/api/clients/:id/savings",
            get(savings_history).post(deposit_savings),
        )
        .route("/api/savings", post(adjust_savings))
}
