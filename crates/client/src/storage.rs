//! Durable client storage.
//!
//! [`KeyValueStore`] is the string-to-string storage the session snapshot
//! lives in. [`FileStore`] keeps all keys in one JSON file and replaces it
//! atomically (write to a sibling temp file, then rename). [`MemoryStore`]
//! is for tests and ephemeral sessions.
//!
//! [`SessionStore`] maps the session onto two keys:
//!
//! - `v_user_data`: the serialized profile, removed when there is none
//! - `v_is_logged_in`: `"true"` or `"false"`

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

use varnothsava_core::UserProfile;

/// Key holding the serialized profile.
pub const USER_DATA_KEY: &str = "v_user_data";
/// Key holding the login flag.
pub const LOGGED_IN_KEY: &str = "v_is_logged_in";

/// Errors that can occur when reading or writing storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("storage file {path} is not a JSON object: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A single change in a batch write. `None` removes the key.
pub type Change<'a> = (&'a str, Option<String>);

/// String key-value storage.
pub trait KeyValueStore {
    /// Read a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Apply several changes as one write.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn write_batch(&mut self, changes: &[Change<'_>]) -> Result<(), StorageError>;

    /// Store a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.write_batch(&[(key, Some(value.to_string()))])
    }

    /// Remove a value. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.write_batch(&[(key, None)])
    }
}

/// All keys in a single JSON file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Open the store at `path`. A missing file is an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|source| {
                StorageError::Corrupt {
                    path: path.clone(),
                    source,
                }
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StorageError::Io { path, source }),
        };
        Ok(Self { path, entries })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let json = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&tmp, json).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn write_batch(&mut self, changes: &[Change<'_>]) -> Result<(), StorageError> {
        for (key, value) in changes {
            match value {
                Some(value) => {
                    self.entries.insert((*key).to_string(), value.clone());
                }
                None => {
                    self.entries.remove(*key);
                }
            }
        }
        self.flush()
    }
}

/// In-memory store. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries().get(key).cloned())
    }

    fn write_batch(&mut self, changes: &[Change<'_>]) -> Result<(), StorageError> {
        let mut entries = self.entries();
        for (key, value) in changes {
            match value {
                Some(value) => {
                    entries.insert((*key).to_string(), value.clone());
                }
                None => {
                    entries.remove(*key);
                }
            }
        }
        Ok(())
    }
}

/// What survives a restart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub profile: Option<UserProfile>,
    pub is_logged_in: bool,
}

/// Session snapshot on top of a [`KeyValueStore`].
#[derive(Debug)]
pub struct SessionStore<S> {
    store: S,
}

impl<S: KeyValueStore> SessionStore<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Load the snapshot.
    ///
    /// The profile is restored only when the login flag is `"true"` and
    /// the record parses; a corrupt record is logged and ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store cannot be read.
    pub fn load(&self) -> Result<Snapshot, StorageError> {
        let logged_in = self.store.get(LOGGED_IN_KEY)?.as_deref() == Some("true");
        if !logged_in {
            return Ok(Snapshot::default());
        }

        let Some(raw) = self.store.get(USER_DATA_KEY)? else {
            return Ok(Snapshot::default());
        };

        match serde_json::from_str::<UserProfile>(&raw) {
            Ok(profile) => Ok(Snapshot {
                profile: Some(profile),
                is_logged_in: true,
            }),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring corrupt stored profile");
                Ok(Snapshot::default())
            }
        }
    }

    /// Persist the snapshot in one write.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile cannot be serialized or the store
    /// cannot be written.
    pub fn save(
        &mut self,
        profile: Option<&UserProfile>,
        is_logged_in: bool,
    ) -> Result<(), StorageError> {
        let user_data = profile.map(serde_json::to_string).transpose()?;
        self.store.write_batch(&[
            (USER_DATA_KEY, user_data),
            (LOGGED_IN_KEY, Some(is_logged_in.to_string())),
        ])
    }

    /// The underlying key-value store.
    pub const fn inner(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use varnothsava_core::{Email, NewProfile, ProfileCode, StudentType, UserId};

    use super::*;

    fn profile() -> UserProfile {
        UserProfile::from_registration(
            UserId::new("uid-1"),
            NewProfile {
                name: "Meera".to_string(),
                email: Email::parse("meera@gmail.com").unwrap(),
                usn: "4MT20IS042".to_string(),
                college_name: "MITE".to_string(),
                age: "21".to_string(),
                phone: "9123456780".to_string(),
                id_card_url: Some("https://cdn.example/id/meera.png".to_string()),
            },
            ProfileCode::parse("MEERA7").unwrap(),
            StudentType::External,
            String::new(),
        )
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let mut store = FileStore::open(&path).unwrap();
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        store.remove("a").unwrap();

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("a").unwrap(), None);
        assert_eq!(reopened.get("b").unwrap().as_deref(), Some("2"));

        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("session.json")]);
    }

    #[test]
    fn test_file_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(matches!(
            FileStore::open(&path),
            Err(StorageError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_memory_store_clones_share_entries() {
        let store = MemoryStore::new();
        let mut writer = store.clone();
        writer.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_session_round_trip() {
        let mut session = SessionStore::new(MemoryStore::new());
        session.save(Some(&profile()), true).unwrap();

        let snapshot = session.load().unwrap();
        assert!(snapshot.is_logged_in);
        assert_eq!(snapshot.profile, Some(profile()));
        assert_eq!(
            session.inner().get(LOGGED_IN_KEY).unwrap().as_deref(),
            Some("true")
        );
    }

    #[test]
    fn test_profile_ignored_when_flag_false() {
        let mut session = SessionStore::new(MemoryStore::new());
        session.save(Some(&profile()), false).unwrap();
        assert_eq!(session.load().unwrap(), Snapshot::default());
    }

    #[test]
    fn test_clearing_profile_removes_key() {
        let mut session = SessionStore::new(MemoryStore::new());
        session.save(Some(&profile()), true).unwrap();
        session.save(None, false).unwrap();
        assert_eq!(session.inner().get(USER_DATA_KEY).unwrap(), None);
        assert_eq!(
            session.inner().get(LOGGED_IN_KEY).unwrap().as_deref(),
            Some("false")
        );
    }

    #[test]
    fn test_corrupt_record_is_ignored() {
        let mut store = MemoryStore::new();
        store.set(LOGGED_IN_KEY, "true").unwrap();
        store.set(USER_DATA_KEY, "{not json").unwrap();
        let session = SessionStore::new(store);
        assert_eq!(session.load().unwrap(), Snapshot::default());
    }
}
