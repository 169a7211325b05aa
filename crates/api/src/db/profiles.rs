//! `PostgreSQL` profile repository.
//!
//! Queries are built at runtime so the crate compiles without a live
//! database; the table layout lives in `crates/api/migrations/`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use varnothsava_core::{ProfileCode, UserId, UserProfile};

use super::{ProfileStore, RepositoryError, StoredProfile, write_stamp};

/// Profile store backed by the `varnothsava.profile` table.
#[derive(Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    /// Create a new profile repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn get(&self, uid: &UserId) -> Result<Option<StoredProfile>, RepositoryError> {
        let row: Option<(Json<UserProfile>, DateTime<Utc>)> = sqlx::query_as(
            r"
            SELECT profile, created_at
            FROM varnothsava.profile
            WHERE uid = $1
            ",
        )
        .bind(uid.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some((Json(profile), created_at)) = row else {
            return Ok(None);
        };

        if &profile.id != uid {
            return Err(RepositoryError::DataCorruption(format!(
                "profile under {uid} carries id {}",
                profile.id
            )));
        }

        Ok(Some(StoredProfile {
            profile,
            created_at,
        }))
    }

    async fn find_by_code(
        &self,
        code: &ProfileCode,
    ) -> Result<Option<StoredProfile>, RepositoryError> {
        let row: Option<(Json<UserProfile>, DateTime<Utc>)> = sqlx::query_as(
            r"
            SELECT profile, created_at
            FROM varnothsava.profile
            WHERE profile->>'profileCode' = $1
            ORDER BY created_at
            LIMIT 1
            ",
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(Json(profile), created_at)| StoredProfile {
            profile,
            created_at,
        }))
    }

    async fn upsert(&self, mut profile: UserProfile) -> Result<StoredProfile, RepositoryError> {
        let stamp = write_stamp(&profile);
        profile.updated_at = Some(stamp);

        let row: Option<(DateTime<Utc>,)> = sqlx::query_as(
            r"
            INSERT INTO varnothsava.profile (uid, profile, created_at, updated_at)
            VALUES ($1, $2, now(), $3)
            ON CONFLICT (uid) DO UPDATE
                SET profile = EXCLUDED.profile,
                    updated_at = EXCLUDED.updated_at
                WHERE varnothsava.profile.updated_at <= EXCLUDED.updated_at
            RETURNING created_at
            ",
        )
        .bind(profile.id.as_str())
        .bind(Json(&profile))
        .bind(stamp)
        .fetch_optional(&self.pool)
        .await?;

        let (created_at,) = row.ok_or_else(|| {
            RepositoryError::Conflict(format!(
                "stored profile for {} is newer than {stamp}",
                profile.id
            ))
        })?;

        tracing::debug!(uid = %profile.id, %created_at, "profile upserted");

        Ok(StoredProfile {
            profile,
            created_at,
        })
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
