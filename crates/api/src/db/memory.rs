//! In-memory profile store for development and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use varnothsava_core::{ProfileCode, UserId, UserProfile};

use super::{ProfileStore, RepositoryError, StoredProfile, write_stamp};

/// Profile store kept in process memory. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    profiles: RwLock<HashMap<UserId, StoredProfile>>,
}

impl MemoryProfileStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored profiles.
    pub async fn len(&self) -> usize {
        self.profiles.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.profiles.read().await.is_empty()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get(&self, uid: &UserId) -> Result<Option<StoredProfile>, RepositoryError> {
        Ok(self.profiles.read().await.get(uid).cloned())
    }

    async fn find_by_code(
        &self,
        code: &ProfileCode,
    ) -> Result<Option<StoredProfile>, RepositoryError> {
        Ok(self
            .profiles
            .read()
            .await
            .values()
            .filter(|stored| &stored.profile.profile_code == code)
            .min_by_key(|stored| stored.created_at)
            .cloned())
    }

    async fn upsert(&self, mut profile: UserProfile) -> Result<StoredProfile, RepositoryError> {
        let stamp = write_stamp(&profile);
        profile.updated_at = Some(stamp);

        let mut profiles = self.profiles.write().await;
        let created_at = match profiles.get(&profile.id) {
            Some(existing) => {
                if existing.profile.updated_at.is_some_and(|stored| stored > stamp) {
                    return Err(RepositoryError::Conflict(format!(
                        "stored profile for {} is newer than {stamp}",
                        profile.id
                    )));
                }
                existing.created_at
            }
            None => Utc::now(),
        };

        let stored = StoredProfile {
            profile,
            created_at,
        };
        profiles.insert(stored.profile.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone};
    use varnothsava_core::{Email, NewProfile, ProfileCode, StudentType};

    use super::*;

    fn profile(uid: &str) -> UserProfile {
        UserProfile::from_registration(
            UserId::new(uid),
            NewProfile {
                name: "Ravi".to_string(),
                email: Email::parse("ravi@gmail.com").unwrap(),
                usn: "4SO22EC017".to_string(),
                college_name: "NITK".to_string(),
                age: "20".to_string(),
                phone: "9876543210".to_string(),
                id_card_url: None,
            },
            ProfileCode::parse("RAVI01").unwrap(),
            StudentType::External,
            String::new(),
        )
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = MemoryProfileStore::new();
        assert!(store.get(&UserId::new("nobody")).await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_upsert_stamps_and_keeps_created_at() {
        let store = MemoryProfileStore::new();
        let first = store.upsert(profile("u1")).await.unwrap();
        assert!(first.profile.updated_at.is_some());

        let mut update = profile("u1");
        update.has_paid = true;
        update.updated_at = Some(first.profile.updated_at.unwrap() + Duration::seconds(5));
        let second = store.upsert(update).await.unwrap();

        assert_eq!(second.created_at, first.created_at);
        let fetched = store.get(&UserId::new("u1")).await.unwrap().unwrap();
        assert!(fetched.profile.has_paid);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_stale_write_is_rejected() {
        let store = MemoryProfileStore::new();
        let newer = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();

        let mut current = profile("u1");
        current.updated_at = Some(newer);
        current.has_paid = true;
        store.upsert(current).await.unwrap();

        let mut stale = profile("u1");
        stale.updated_at = Some(newer - Duration::minutes(1));
        let result = store.upsert(stale).await;
        assert!(matches!(result, Err(RepositoryError::Conflict(_))));

        let fetched = store.get(&UserId::new("u1")).await.unwrap().unwrap();
        assert!(fetched.profile.has_paid);
    }

    #[tokio::test]
    async fn test_find_by_code() {
        let store = MemoryProfileStore::new();
        store.upsert(profile("u1")).await.unwrap();

        let found = store
            .find_by_code(&ProfileCode::parse("ravi01").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.profile.id, UserId::new("u1"));

        let missing = store
            .find_by_code(&ProfileCode::parse("ZZZZZZ").unwrap())
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_equal_stamp_is_accepted() {
        let store = MemoryProfileStore::new();
        let stamp = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let mut p = profile("u1");
        p.updated_at = Some(stamp);
        store.upsert(p.clone()).await.unwrap();
        assert!(store.upsert(p).await.is_ok());
    }

    #[test]
    fn test_stored_profile_wire_format() {
        let stored = StoredProfile {
            profile: profile("u1"),
            created_at: Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
        };
        let json = serde_json::to_value(&stored).unwrap();
        assert_eq!(json["id"], "u1");
        assert_eq!(json["profileCode"], "RAVI01");
        assert_eq!(json["createdAt"], "2026-01-02T03:04:05Z");
    }
}
