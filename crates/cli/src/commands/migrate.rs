//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! vn-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `API_DATABASE_URL` - `PostgreSQL` connection string for the profile store
//! - `DATABASE_URL` - Fallback when `API_DATABASE_URL` is not set
//!
//! Migrations live in `crates/api/migrations/`.

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Missing environment variable: API_DATABASE_URL (or DATABASE_URL)")]
    MissingDatabaseUrl,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

fn database_url() -> Result<SecretString, MigrationError> {
    ["API_DATABASE_URL", "DATABASE_URL"]
        .into_iter()
        .find_map(|key| std::env::var(key).ok().filter(|v| !v.trim().is_empty()))
        .map(SecretString::from)
        .ok_or(MigrationError::MissingDatabaseUrl)
}

/// Run the profile store migrations.
///
/// # Errors
///
/// Returns an error if no database URL is configured, the connection fails,
/// or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let database_url = database_url()?;

    tracing::info!("Connecting to profile database...");
    let pool = PgPool::connect(database_url.expose_secret()).await?;

    tracing::info!("Running profile migrations...");
    sqlx::migrate!("../api/migrations").run(&pool).await?;

    tracing::info!("Profile migrations complete!");
    Ok(())
}
