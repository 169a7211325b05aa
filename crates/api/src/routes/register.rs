//! `POST /api/register`: create or replace the caller's profile.

use axum::{Json, body::Bytes, extract::State};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use varnothsava_core::UserProfile;

use crate::db::RepositoryError;
use crate::error::{AppError, Result};
use crate::middleware::BearerAuth;
use crate::state::AppState;

const INVALID_REQUEST: &str = "Invalid request data.";

/// Request body: `{ "uid": "...", "user": { ...profile... } }`.
#[derive(Debug, Deserialize)]
struct RegisterRequest {
    uid: Option<String>,
    user: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

fn bad_request() -> AppError {
    AppError::BadRequest(INVALID_REQUEST.to_string())
}

/// Parse the body into the profile to store under `uid`.
///
/// The document's `id` is overwritten with `uid` before validation.
fn parse_request(body: &[u8]) -> Result<(String, UserProfile)> {
    let request: RegisterRequest = serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(error = %e, "register body is not valid JSON");
        bad_request()
    })?;

    let uid = request
        .uid
        .filter(|uid| !uid.trim().is_empty())
        .ok_or_else(bad_request)?;

    let Some(Value::Object(mut user)) = request.user else {
        return Err(bad_request());
    };
    user.insert("id".to_string(), Value::String(uid.clone()));

    let profile = serde_json::from_value(Value::Object(user)).map_err(|e| {
        tracing::debug!(error = %e, "register body is not a profile");
        bad_request()
    })?;

    Ok((uid, profile))
}

/// Store the caller's profile.
///
/// 401 without a valid token, 400 for a malformed body or missing
/// `uid`/`user`, 403 when `uid` is not the token's subject or the profile's
/// e-mail is not the token's, 409 when a newer version is already stored.
#[instrument(skip_all, fields(uid = %identity.uid))]
pub async fn register(
    State(state): State<AppState>,
    BearerAuth(identity): BearerAuth,
    body: Bytes,
) -> Result<Json<MessageResponse>> {
    let (uid, profile) = parse_request(&body)?;

    if uid != identity.uid.as_str() {
        return Err(AppError::Forbidden(
            "Cannot register a profile for another user.".to_string(),
        ));
    }

    if let Some(email) = identity.email.as_deref()
        && !profile.email.matches(email)
    {
        tracing::warn!(profile_email = %profile.email, "profile e-mail differs from token");
        return Err(AppError::Forbidden(
            "Profile e-mail must match the signed-in account.".to_string(),
        ));
    }

    state.profiles().upsert(profile).await.map_err(|e| match e {
        RepositoryError::Conflict(detail) => {
            tracing::info!(%detail, "stale profile write rejected");
            AppError::Conflict("A newer version of this profile is already stored.".to_string())
        }
        other => other.into(),
    })?;

    tracing::info!("profile stored");

    Ok(Json(MessageResponse {
        message: "User registered successfully.",
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use serde_json::json;
    use varnothsava_core::UserId;

    use crate::db::{MemoryProfileStore, ProfileStore};
    use crate::routes::test_support::{ASHA_TOKEN, RAVI_TOKEN, json_body, send, state_with};

    fn user_doc() -> serde_json::Value {
        json!({
            "name": "Asha",
            "email": "asha@sode-edu.in",
            "usn": "4SO21CS001",
            "collegeName": "SMVITM",
            "age": "19",
            "phone": "9999999999",
            "profileCode": "ASHA01",
            "hasPaid": false,
            "registeredEvents": [],
            "avatar": "",
            "studentType": "internal"
        })
    }

    async fn post(
        store: Arc<MemoryProfileStore>,
        token: Option<&str>,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let response = send(
            state_with(store),
            "POST",
            "/api/register",
            token,
            Some(body.to_string()),
        )
        .await;
        json_body(response).await
    }

    #[tokio::test]
    async fn test_register_stores_profile() {
        let store = Arc::new(MemoryProfileStore::new());
        let (status, body) = post(
            store.clone(),
            Some(ASHA_TOKEN),
            json!({ "uid": "uid-asha", "user": user_doc() }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "User registered successfully.");

        let stored = store.get(&UserId::new("uid-asha")).await.unwrap().unwrap();
        assert_eq!(stored.profile.name, "Asha");
        assert_eq!(stored.profile.id, UserId::new("uid-asha"));
    }

    #[tokio::test]
    async fn test_id_is_normalized_to_uid() {
        let store = Arc::new(MemoryProfileStore::new());
        let mut user = user_doc();
        user["id"] = json!("something-else");
        let (status, _) = post(
            store.clone(),
            Some(ASHA_TOKEN),
            json!({ "uid": "uid-asha", "user": user }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(store.get(&UserId::new("uid-asha")).await.unwrap().is_some());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_missing_uid_or_user_is_400() {
        for body in [
            json!({ "user": user_doc() }),
            json!({ "uid": "uid-asha" }),
            json!({ "uid": "", "user": user_doc() }),
            json!({ "uid": "uid-asha", "user": null }),
        ] {
            let store = Arc::new(MemoryProfileStore::new());
            let (status, response) = post(store.clone(), Some(ASHA_TOKEN), body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(response["message"], "Invalid request data.");
            assert!(store.is_empty().await);
        }
    }

    #[tokio::test]
    async fn test_malformed_profile_is_400() {
        let mut user = user_doc();
        user["email"] = json!("not-an-email");
        let (status, _) = post(
            Arc::new(MemoryProfileStore::new()),
            Some(ASHA_TOKEN),
            json!({ "uid": "uid-asha", "user": user }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_non_json_body_is_400() {
        let response = send(
            state_with(Arc::new(MemoryProfileStore::new())),
            "POST",
            "/api/register",
            Some(ASHA_TOKEN),
            Some("uid=uid-asha".to_string()),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_token_is_401_before_body_checks() {
        let store = Arc::new(MemoryProfileStore::new());
        let (status, _) = post(store.clone(), None, json!({})).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_uid_mismatch_is_403() {
        let store = Arc::new(MemoryProfileStore::new());
        let (status, _) = post(
            store.clone(),
            Some(RAVI_TOKEN),
            json!({ "uid": "uid-asha", "user": user_doc() }),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_email_must_match_token() {
        let store = Arc::new(MemoryProfileStore::new());
        let mut user = user_doc();
        user["email"] = json!("someone-else@sode-edu.in");
        let (status, _) = post(
            store.clone(),
            Some(ASHA_TOKEN),
            json!({ "uid": "uid-asha", "user": user }),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(store.is_empty().await);

        let mut user = user_doc();
        user["email"] = json!("ASHA@sode-edu.in");
        let (status, _) = post(
            store.clone(),
            Some(ASHA_TOKEN),
            json!({ "uid": "uid-asha", "user": user }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_stale_write_is_409() {
        let store = Arc::new(MemoryProfileStore::new());

        let mut newer = user_doc();
        newer["hasPaid"] = json!(true);
        newer["updatedAt"] = json!("2026-03-01T12:00:00Z");
        let (status, _) = post(
            store.clone(),
            Some(ASHA_TOKEN),
            json!({ "uid": "uid-asha", "user": newer }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let mut stale = user_doc();
        stale["updatedAt"] = json!("2026-03-01T11:00:00Z");
        let (status, _) = post(
            store.clone(),
            Some(ASHA_TOKEN),
            json!({ "uid": "uid-asha", "user": stale }),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let stored = store.get(&UserId::new("uid-asha")).await.unwrap().unwrap();
        assert!(stored.profile.has_paid);
    }
}
