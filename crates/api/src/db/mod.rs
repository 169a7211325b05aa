//! Profile document storage.
//!
//! # Database: `varnothsava`
//!
//! ## Tables
//!
//! - `varnothsava.profile` - One JSONB profile document per identity uid,
//!   with `created_at` (first insert) and `updated_at` (last-write-wins stamp)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p varnothsava-cli -- migrate
//! ```
//!
//! Without a database URL the server falls back to [`MemoryProfileStore`],
//! which is only suitable for local development and tests.

pub mod memory;
pub mod profiles;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use varnothsava_core::{ProfileCode, UserId, UserProfile};

pub use memory::MemoryProfileStore;
pub use profiles::PgProfileStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// The stored profile carries a newer stamp than the incoming write.
    #[error("conflict: {0}")]
    Conflict(String),
}

/// A profile as held by the store.
///
/// Serializes as the profile document with an extra `createdAt` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredProfile {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub created_at: DateTime<Utc>,
}

/// Storage for participant profiles, keyed by identity uid.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fetch the profile stored for `uid`.
    async fn get(&self, uid: &UserId) -> Result<Option<StoredProfile>, RepositoryError>;

    /// Find a profile by its shareable code.
    ///
    /// Codes are not unique; the earliest registration wins.
    async fn find_by_code(&self, code: &ProfileCode)
    -> Result<Option<StoredProfile>, RepositoryError>;

    /// Insert or replace the profile stored under `profile.id`.
    ///
    /// The write is stamped with `profile.updated_at` (or the current time
    /// when absent). A write older than the stored stamp is rejected with
    /// `RepositoryError::Conflict`; `created_at` is kept from the first insert.
    async fn upsert(&self, profile: UserProfile) -> Result<StoredProfile, RepositoryError>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// The stamp a write is ordered by.
pub(crate) fn write_stamp(profile: &UserProfile) -> DateTime<Utc> {
    profile.updated_at.unwrap_or_else(Utc::now)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
