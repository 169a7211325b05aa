//! Bearer-token authentication extractor.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::{AppError, set_sentry_user};
use crate::identity::VerifiedToken;
use crate::state::AppState;

/// Extractor that requires a valid `Authorization: Bearer <token>` header.
///
/// Rejects with 401 when the header is missing, not a bearer credential,
/// or the token fails verification.
///
/// # Example
///
/// ```rust,ignore
/// async fn me(BearerAuth(identity): BearerAuth) -> String {
///     identity.uid.to_string()
/// }
/// ```
#[derive(Debug, Clone)]
pub struct BearerAuth(pub VerifiedToken);

/// Pull the token out of an `Authorization` header value.
fn bearer_token(value: &str) -> Option<&str> {
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for BearerAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;

        let verified = state.verifier().verify(token).await?;

        tracing::Span::current().record("uid", verified.uid.as_str());
        set_sentry_user(&verified.uid, verified.email.as_deref());

        Ok(Self(verified))
    }
}
