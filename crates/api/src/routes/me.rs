//! `GET /api/me`: the caller's stored profile.

use axum::{Json, extract::State};
use serde::Serialize;
use tracing::instrument;

use crate::db::StoredProfile;
use crate::error::{AppError, Result};
use crate::middleware::BearerAuth;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: StoredProfile,
}

/// Return the profile stored under the token's uid.
///
/// 401 without a valid bearer token, 404 when no profile exists yet.
#[instrument(skip_all, fields(uid = %identity.uid))]
pub async fn me(
    State(state): State<AppState>,
    BearerAuth(identity): BearerAuth,
) -> Result<Json<MeResponse>> {
    let user = state
        .profiles()
        .get(&identity.uid)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;

    Ok(Json(MeResponse { user }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use varnothsava_core::{Email, NewProfile, ProfileCode, StudentType, UserId, UserProfile};

    use crate::db::{MemoryProfileStore, ProfileStore};
    use crate::routes::test_support::{ASHA_TOKEN, json_body, send, state_with};

    #[tokio::test]
    async fn test_missing_authorization_is_401() {
        let store = Arc::new(MemoryProfileStore::new());
        let response = send(state_with(store.clone()), "GET", "/api/me", None, None).await;
        let (status, body) = json_body(response).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Unauthorized.");
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_unknown_token_is_401() {
        let store = Arc::new(MemoryProfileStore::new());
        let response = send(state_with(store), "GET", "/api/me", Some("forged"), None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_no_profile_is_404() {
        let store = Arc::new(MemoryProfileStore::new());
        let response = send(state_with(store), "GET", "/api/me", Some(ASHA_TOKEN), None).await;
        let (status, body) = json_body(response).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "User not found.");
    }

    #[tokio::test]
    async fn test_returns_stored_profile() {
        let store = Arc::new(MemoryProfileStore::new());
        let profile = UserProfile::from_registration(
            UserId::new("uid-asha"),
            NewProfile {
                name: "Asha".to_string(),
                email: Email::parse("asha@sode-edu.in").unwrap(),
                usn: "4SO21CS001".to_string(),
                college_name: "SMVITM".to_string(),
                age: "19".to_string(),
                phone: "9999999999".to_string(),
                id_card_url: None,
            },
            ProfileCode::parse("ASHA01").unwrap(),
            StudentType::Internal,
            String::new(),
        );
        store.upsert(profile).await.unwrap();

        let response = send(state_with(store), "GET", "/api/me", Some(ASHA_TOKEN), None).await;
        let (status, body) = json_body(response).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["id"], "uid-asha");
        assert_eq!(body["user"]["profileCode"], "ASHA01");
        assert!(body["user"]["createdAt"].is_string());
    }
}
