//! Route definitions for the Lendflow API

mod analytics;
mod auth;
mod client;
mod group;
mod loan;
mod user;

pub use analytics::analytics_routes;
pub use auth::auth_routes;
pub use client::client_routes;
pub use group::group_routes;
pub use loan::loan_routes;
pub use user::user_routes;

use axum::{
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::handlers::analytics::health_check;
use crate::middleware::{self, RateLimiter};
use crate::state::AppState;

/// The full application router with its middleware stack
pub fn app(state: AppState, rate_limiter: RateLimiter, cors_allowed_origins: Option<&str>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(auth_routes())
        .merge(user_routes())
        .merge(client_routes())
        .merge(group_routes())
        .merge(loan_routes())
        .merge(analytics_routes())
        .with_state(state)
        .layer(axum::middleware::from_fn(middleware::security_headers))
        .layer(axum::middleware::from_fn(middleware::request_tracing))
        .layer(axum::middleware::from_fn_with_state(
            rate_limiter,
            middleware::rate_limit,
        ))
        .layer(configure_cors(cors_allowed_origins))
}

fn configure_cors(allowed_origins: Option<&str>) -> CorsLayer {
    let allowed_origins = allowed_origins.unwrap_or_default().trim();

    if allowed_origins.is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}
