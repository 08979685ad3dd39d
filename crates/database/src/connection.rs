use crate::error::DbError;
use dotenvy::dotenv;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::env;
use std::time::Duration;
use tracing::{debug, info};

/// Establishes a connection pool to the PostgreSQL database.
///
/// Reads `DATABASE_URL` from the environment, loading a `.env` file first if
/// one is present.
pub async fn connect() -> Result<PgPool, DbError> {
    if let Err(e) = dotenv() {
        debug!(error = %e, "No .env file loaded");
    }

    let database_url = env::var("DATABASE_URL")
        .map_err(|_e| DbError::ConnectionConfigError("DATABASE_URL must be set.".to_string()))?;

    connect_with_url(&database_url).await
}

/// Establishes a connection pool to an explicit database URL.
pub async fn connect_with_url(database_url: &str) -> Result<PgPool, DbError> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await?;

    info!("Connected to return database");
    Ok(pool)
}

/// Applies the embedded schema migrations (programs, markets, pnl_records).
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
