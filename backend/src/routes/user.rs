//! Staff user route definitions

use axum::{
    routing::{delete, get},
    Router,
};

use crate::handlers::user::{create_user, deactivate_user, list_users};
use crate::state::AppState;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list_users).post(create_user))
        .route("/api/users/:id", delete(deactivate_user))
}
