//! Record store selection

use anyhow::{Context, Result};
use casetrack_core::Config;
use casetrack_db::{CaseStore, InMemoryCaseStore, PgCaseStore, MIGRATOR};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

/// Connect the pool and apply pending migrations.
pub async fn setup_database(config: &Config, database_url: &str) -> Result<PgPool> {
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections())
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds()))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!(
        max_connections = config.db_max_connections(),
        "Database connected successfully"
    );

    MIGRATOR
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    Ok(pool)
}

/// Postgres when `DATABASE_URL` is set, otherwise the in-memory store.
pub async fn setup_store(config: &Config) -> Result<Arc<dyn CaseStore>> {
    match config.database_url() {
        Some(url) => {
            let pool = setup_database(config, url).await?;
            Ok(Arc::new(PgCaseStore::new(pool)))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; cases are kept in memory and lost on restart");
            Ok(Arc::new(InMemoryCaseStore::new()))
        }
    }
}
