//! Application state shared across handlers.

use std::sync::Arc;

use crate::db::ProfileStore;
use crate::identity::TokenVerifier;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// profile store and the token verifier.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    profiles: Arc<dyn ProfileStore>,
    verifier: Arc<dyn TokenVerifier>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(profiles: Arc<dyn ProfileStore>, verifier: Arc<dyn TokenVerifier>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { profiles, verifier }),
        }
    }

    /// Get the profile store.
    #[must_use]
    pub fn profiles(&self) -> &dyn ProfileStore {
        self.inner.profiles.as_ref()
    }

    /// Get the bearer-token verifier.
    #[must_use]
    pub fn verifier(&self) -> &dyn TokenVerifier {
        self.inner.verifier.as_ref()
    }
}
