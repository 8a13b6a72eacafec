//! Lendflow Backend Server
//!
//! Loads configuration, connects to PostgreSQL, applies migrations and serves
//! the loan workflow API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;

use lendflow_server::config::Config;
use lendflow_server::db;
use lendflow_server::middleware::RateLimiter;
use lendflow_server::payments::{HttpPaymentRail, PaymentRail, SimulatedPaymentRail};
use lendflow_server::routes;
use lendflow_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!(
        environment = config.environment.as_str(),
        database = %config.database_url_masked(),
        "Starting Lendflow server"
    );

    let db_pool = db::create_pool(&config).await?;
    db::run_migrations(&db_pool).await?;

    let payment_rail: Arc<dyn PaymentRail> = match &config.payment_rail_url {
        Some(url) => Arc::new(
            HttpPaymentRail::new(
                url.clone(),
                Duration::from_secs(config.payment_rail_timeout_seconds),
            )
            .context("Failed to build payment rail client")?,
        ),
        None => {
            if config.environment.is_production() {
                tracing::warn!("PAYMENT_RAIL_URL not set in production, disbursements are simulated");
            }
            Arc::new(SimulatedPaymentRail)
        }
    };
    tracing::info!(rail = payment_rail.name(), "Payment rail configured");

    let app_state = AppState::new(db_pool, &config, payment_rail);

    if let Some(admin) = &config.bootstrap_admin {
        if let Err(e) = app_state
            .user_service
            .ensure_bootstrap_admin(&admin.email, &admin.password)
            .await
        {
            tracing::error!(error = %e, "Failed to create bootstrap super admin");
        }
    }

    let rate_limiter = RateLimiter::new(config.rate_limit_rps);
    rate_limiter.spawn_pruner(Duration::from_secs(60));

    let app = routes::app(app_state, rate_limiter, config.cors_allowed_origins.as_deref());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check at http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
