//! `GET /api/profiles/{code}`: resolve a teammate's profile code.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use varnothsava_core::{ProfileCode, ProfileSummary};

use crate::error::{AppError, Result};
use crate::middleware::BearerAuth;
use crate::state::AppState;

/// Look up a participant by profile code.
///
/// Only the code and name are returned. 401 without a valid token, 400 for
/// a malformed code, 404 when no participant holds it.
#[instrument(skip_all, fields(uid = %identity.uid, code = %code))]
pub async fn by_code(
    State(state): State<AppState>,
    BearerAuth(identity): BearerAuth,
    Path(code): Path<String>,
) -> Result<Json<ProfileSummary>> {
    let code = ProfileCode::parse(&code)
        .map_err(|e| AppError::BadRequest(format!("Invalid profile code: {e}.")))?;

    let stored = state
        .profiles()
        .find_by_code(&code)
        .await?
        .ok_or_else(|| AppError::NotFound("No participant with this code.".to_string()))?;

    Ok(Json(stored.profile.summary()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use varnothsava_core::{Email, NewProfile, StudentType, UserId, UserProfile};

    use crate::db::{MemoryProfileStore, ProfileStore};
    use crate::routes::test_support::{RAVI_TOKEN, json_body, send, state_with};

    use super::*;

    async fn store_with_asha() -> Arc<MemoryProfileStore> {
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
        store
    }

    #[tokio::test]
    async fn test_lookup_returns_name_only() {
        let store = store_with_asha().await;
        let response = send(
            state_with(store),
            "GET",
            "/api/profiles/asha01",
            Some(RAVI_TOKEN),
            None,
        )
        .await;
        let (status, body) = json_body(response).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["profileCode"], "ASHA01");
        assert_eq!(body["name"], "Asha");
        assert!(body.get("email").is_none());
        assert!(body.get("phone").is_none());
    }

    #[tokio::test]
    async fn test_unknown_code_is_404() {
        let store = store_with_asha().await;
        let response = send(
            state_with(store),
            "GET",
            "/api/profiles/ZZZZZZ",
            Some(RAVI_TOKEN),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_code_is_400() {
        let store = store_with_asha().await;
        let response = send(
            state_with(store),
            "GET",
            "/api/profiles/VAR-X712",
            Some(RAVI_TOKEN),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_lookup_requires_token() {
        let store = store_with_asha().await;
        let response = send(state_with(store), "GET", "/api/profiles/ASHA01", None, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
