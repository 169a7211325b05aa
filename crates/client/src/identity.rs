//! Identity provider accounts.
//!
//! The portal authenticates with e-mail and password against Firebase
//! Authentication. The provider hands back an ID token that the profile API
//! accepts as a bearer credential.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use varnothsava_core::{Email, UserId};

/// Errors from the identity provider.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Unknown e-mail or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Sign-up for an e-mail that already has an account.
    #[error("an account already exists for this e-mail")]
    AccountExists,

    /// Any other provider-side refusal.
    #[error("identity provider rejected the request: {code}")]
    Rejected { code: String, message: String },

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// An authenticated identity-provider session.
#[derive(Clone)]
pub struct IdentitySession {
    pub uid: UserId,
    pub email: String,
    /// Short-lived bearer token for the profile API.
    pub id_token: SecretString,
    pub refresh_token: Option<SecretString>,
}

impl std::fmt::Debug for IdentitySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentitySession")
            .field("uid", &self.uid)
            .field("email", &self.email)
            .field("id_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// E-mail/password identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Sign in to an existing account.
    async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<IdentitySession, IdentityError>;

    /// Create an account and sign in to it.
    async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<IdentitySession, IdentityError>;

    /// End the session with the provider.
    async fn sign_out(&self, session: &IdentitySession) -> Result<(), IdentityError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    id_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Map an Identity Toolkit error message (e.g. `WEAK_PASSWORD : Password
/// should be at least 6 characters`) to an [`IdentityError`].
fn map_error_code(message: &str) -> IdentityError {
    let (code, detail) = message
        .split_once(" : ")
        .map_or((message, message), |(code, detail)| (code, detail));
    match code.trim() {
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
            IdentityError::InvalidCredentials
        }
        "EMAIL_EXISTS" => IdentityError::AccountExists,
        other => IdentityError::Rejected {
            code: other.to_string(),
            message: detail.trim().to_string(),
        },
    }
}

/// Firebase Authentication over the Identity Toolkit REST API.
#[derive(Clone)]
pub struct FirebaseIdentity {
    client: reqwest::Client,
    base_url: Url,
    api_key: SecretString,
}

impl FirebaseIdentity {
    /// Create a client for `base_url` (e.g. `https://identitytoolkit.googleapis.com/v1`).
    #[must_use]
    pub fn new(base_url: Url, api_key: SecretString) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    fn endpoint(&self, method: &str) -> Result<Url, IdentityError> {
        let raw = format!(
            "{}/accounts:{method}",
            self.base_url.as_str().trim_end_matches('/')
        );
        let mut url = Url::parse(&raw).map_err(|e| IdentityError::Parse(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("key", self.api_key.expose_secret());
        Ok(url)
    }

    async fn password_call(
        &self,
        method: &str,
        email: &Email,
        password: &SecretString,
    ) -> Result<IdentitySession, IdentityError> {
        let body = PasswordRequest {
            email: email.as_str(),
            password: password.expose_secret(),
            return_secure_token: true,
        };

        let response = self
            .client
            .post(self.endpoint(method)?)
            .json(&body)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let err = serde_json::from_str::<ErrorEnvelope>(&text).map_or_else(
                |_| IdentityError::Rejected {
                    code: status.as_u16().to_string(),
                    message: text.chars().take(200).collect(),
                },
                |envelope| map_error_code(&envelope.error.message),
            );
            tracing::debug!(%status, error = %err, method, "identity provider refused");
            return Err(err);
        }

        let parsed: PasswordResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::Parse(e.to_string()))?;

        Ok(IdentitySession {
            uid: UserId::new(parsed.local_id),
            email: parsed.email.unwrap_or_else(|| email.to_string()),
            id_token: SecretString::from(parsed.id_token),
            refresh_token: parsed.refresh_token.map(SecretString::from),
        })
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<IdentitySession, IdentityError> {
        self.password_call("signInWithPassword", email, password)
            .await
    }

    async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<IdentitySession, IdentityError> {
        self.password_call("signUp", email, password).await
    }

    async fn sign_out(&self, session: &IdentitySession) -> Result<(), IdentityError> {
        // ID tokens are stateless; dropping them is the sign-out.
        tracing::debug!(uid = %session.uid, "identity session dropped");
        Ok(())
    }
}
