//! PostgreSQL pool, migrations and health probe

use std::time::{Duration, Instant};

use serde::Serialize;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Executor;

use crate::config::Config;

/// Name reported in `pg_stat_activity`
pub const APPLICATION_NAME: &str = "lendflow-server";

/// Upper bound for a single statement; transitions hold row locks while they run
pub const STATEMENT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Failed to connect to database: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("Failed to run migrations: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Database health check failed: {0}")]
    HealthCheck(#[source] sqlx::Error),
}

/// Connection state reported by `/health`
#[derive(Debug, Clone, Serialize)]
pub struct DbHealth {
    pub latency_ms: u64,
    pub applied_migrations: i64,
}

/// Pool settings derived from configuration. Every new connection is tagged
/// with [`APPLICATION_NAME`] and capped at [`STATEMENT_TIMEOUT`].
pub fn pool_options(config: &Config) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute(session_setup_sql().as_str()).await?;
                Ok(())
            })
        })
}

fn session_setup_sql() -> String {
    format!(
        "SET application_name = '{}'; SET statement_timeout = {}",
        APPLICATION_NAME,
        STATEMENT_TIMEOUT.as_millis()
    )
}

pub async fn create_pool(config: &Config) -> Result<PgPool, DbError> {
    tracing::info!(
        url = %config.database_url_masked(),
        max_connections = config.db_max_connections,
        "Connecting to database"
    );

    let pool = pool_options(config)
        .connect(&config.database_url)
        .await
        .map_err(DbError::Connection)?;

    tracing::info!("Database connection pool created");
    Ok(pool)
}

/// Apply the embedded migrations under `backend/migrations`
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    let migrator = sqlx::migrate!("./migrations");
    tracing::info!(available = migrator.iter().count(), "Running database migrations");

    migrator.run(pool).await?;

    tracing::info!("Database migrations completed");
    Ok(())
}

pub async fn check_health(pool: &PgPool) -> Result<DbHealth, DbError> {
    let started = Instant::now();

    let applied_migrations: i64 = sqlx::query_scalar(
        "SELECT COUNT(*)::BIGINT FROM _sqlx_migrations WHERE success",
    )
    .fetch_one(pool)
    .await
    .map_err(DbError::HealthCheck)?;

    Ok(DbHealth {
        latency_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        applied_migrations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_setup_tags_connection() {
        let sql = session_setup_sql();
        assert!(sql.contains("application_name = 'lendflow-server'"));
        assert!(sql.ends_with("statement_timeout = 30000"));
    }

    #[test]
    fn test_migrations_are_embedded() {
        let migrator = sqlx::migrate!("./migrations");
        assert!(migrator.iter().any(|m| m.description == "init"));
    }
}
