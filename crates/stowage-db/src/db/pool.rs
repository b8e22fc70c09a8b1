//! Connection pool setup

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use stowage_core::StowageConfig;

/// Connect the metadata store pool from configuration. Requires `DATABASE_URL`.
pub async fn connect_pool(config: &StowageConfig) -> Result<PgPool> {
    let database_url = config
        .database_url()
        .context("DATABASE_URL must be set for the PostgreSQL metadata store")?;

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await
        .context("Failed to connect to the metadata database")?;

    tracing::info!(
        max_connections = config.db_max_connections,
        "Database connected successfully"
    );

    Ok(pool)
}
