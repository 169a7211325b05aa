//! Remote profile gateway.
//!
//! Calls against the profile API: `GET /api/me` to read the caller's
//! profile, `POST /api/register` to store one, and `GET /api/profiles/{code}`
//! to resolve a teammate's code. No retries, no caching.

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use varnothsava_core::{ProfileCode, ProfileSummary, UserId, UserProfile};

/// Errors from the profile API.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("profile API returned {status}: {message}")]
    Rejected { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl GatewayError {
    /// Whether the store refused the write because it holds a newer copy.
    #[must_use]
    pub const fn is_stale_write(&self) -> bool {
        matches!(self, Self::Rejected { status: 409, .. })
    }
}

/// What `GET /api/me` said about the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileLookup {
    Found(UserProfile),
    /// No profile stored for this account yet.
    Missing,
    /// Any other non-success status.
    Refused { status: u16 },
}

impl ProfileLookup {
    #[must_use]
    pub fn into_profile(self) -> Option<UserProfile> {
        match self {
            Self::Found(profile) => Some(profile),
            Self::Missing | Self::Refused { .. } => None,
        }
    }
}

/// Reads and writes the signed-in participant's profile.
#[async_trait]
pub trait ProfileGateway: Send + Sync {
    /// Read the profile behind `token`, keeping the reason it is absent.
    async fn lookup_profile(&self, token: &SecretString) -> Result<ProfileLookup, GatewayError>;

    /// Fetch the profile behind `token`. Any non-success answer is `None`.
    async fn fetch_profile(
        &self,
        token: &SecretString,
    ) -> Result<Option<UserProfile>, GatewayError> {
        Ok(self.lookup_profile(token).await?.into_profile())
    }

    /// Store `profile` under `uid`.
    async fn submit_profile(
        &self,
        token: &SecretString,
        uid: &UserId,
        profile: &UserProfile,
    ) -> Result<(), GatewayError>;

    /// Resolve a profile code to the participant's public summary.
    async fn find_member(
        &self,
        token: &SecretString,
        code: &ProfileCode,
    ) -> Result<Option<ProfileSummary>, GatewayError>;
}

#[derive(Deserialize)]
struct MeResponse {
    user: UserProfile,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    uid: &'a UserId,
    user: &'a UserProfile,
}

#[derive(Deserialize)]
struct MessageBody {
    message: String,
}

/// [`ProfileGateway`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpProfileGateway {
    client: reqwest::Client,
    me_url: Url,
    register_url: Url,
    profiles_url: Url,
}

impl HttpProfileGateway {
    /// Create a gateway for the API at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint URLs cannot be derived from `base_url`.
    pub fn new(base_url: &Url) -> Result<Self, GatewayError> {
        let mut base = base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let join = |path: &str| {
            base.join(path)
                .map_err(|e| GatewayError::Parse(format!("invalid API URL: {e}")))
        };

        Ok(Self {
            client: reqwest::Client::new(),
            me_url: join("api/me")?,
            register_url: join("api/register")?,
            profiles_url: join("api/profiles/")?,
        })
    }
}

/// Turn a non-success response into [`GatewayError::Rejected`].
async fn rejection(response: Response) -> GatewayError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<MessageBody>(&text)
        .map_or_else(|_| text.chars().take(200).collect(), |body| body.message);
    GatewayError::Rejected { status, message }
}

#[async_trait]
impl ProfileGateway for HttpProfileGateway {
    #[tracing::instrument(skip_all)]
    async fn lookup_profile(&self, token: &SecretString) -> Result<ProfileLookup, GatewayError> {
        let response = self
            .client
            .get(self.me_url.clone())
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(ProfileLookup::Missing);
        }
        if !status.is_success() {
            tracing::warn!(%status, "profile fetch refused");
            return Ok(ProfileLookup::Refused {
                status: status.as_u16(),
            });
        }

        let body: MeResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Parse(e.to_string()))?;
        Ok(ProfileLookup::Found(body.user))
    }

    #[tracing::instrument(skip(self, token, profile), fields(uid = %uid))]
    async fn submit_profile(
        &self,
        token: &SecretString,
        uid: &UserId,
        profile: &UserProfile,
    ) -> Result<(), GatewayError> {
        let response = self
            .client
            .post(self.register_url.clone())
            .bearer_auth(token.expose_secret())
            .json(&RegisterRequest { uid, user: profile })
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(());
        }
        Err(rejection(response).await)
    }

    #[tracing::instrument(skip(self, token), fields(code = %code))]
    async fn find_member(
        &self,
        token: &SecretString,
        code: &ProfileCode,
    ) -> Result<Option<ProfileSummary>, GatewayError> {
        let url = self
            .profiles_url
            .join(code.as_str())
            .map_err(|e| GatewayError::Parse(format!("invalid lookup URL: {e}")))?;
        let response = self
            .client
            .get(url)
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(rejection(response).await);
        }

        response
            .json()
            .await
            .map(Some)
            .map_err(|e| GatewayError::Parse(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use varnothsava_core::{Email, NewProfile, ProfileCode, StudentType};

    use super::*;

    fn profile() -> UserProfile {
        UserProfile::from_registration(
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
            ProfileCode::parse("ASHA42").unwrap(),
            StudentType::Internal,
            String::new(),
        )
    }

    fn token() -> SecretString {
        SecretString::from("id-token-1")
    }

    fn gateway(server: &MockServer) -> HttpProfileGateway {
        HttpProfileGateway::new(&Url::parse(&server.uri()).unwrap()).unwrap()
    }

    #[test]
    fn test_endpoints_keep_base_path() {
        let gateway =
            HttpProfileGateway::new(&Url::parse("https://fest.example/portal").unwrap()).unwrap();
        assert_eq!(gateway.me_url.as_str(), "https://fest.example/portal/api/me");
        assert_eq!(
            gateway.register_url.as_str(),
            "https://fest.example/portal/api/register"
        );
        assert_eq!(
            gateway.profiles_url.join("K7Q2ZD").unwrap().as_str(),
            "https://fest.example/portal/api/profiles/K7Q2ZD"
        );
    }

    #[tokio::test]
    async fn test_fetch_profile_found() {
        let server = MockServer::start().await;
        let mut user = serde_json::to_value(profile()).unwrap();
        user["createdAt"] = json!("2026-01-15T10:00:00Z");
        Mock::given(method("GET"))
            .and(path("/api/me"))
            .and(header("authorization", "Bearer id-token-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "user": user })))
            .expect(1)
            .mount(&server)
            .await;

        let fetched = gateway(&server).fetch_profile(&token()).await.unwrap();
        assert_eq!(fetched, Some(profile()));
    }

    #[tokio::test]
    async fn test_fetch_profile_non_success_is_none() {
        for status in [401, 404, 500] {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/api/me"))
                .respond_with(
                    ResponseTemplate::new(status).set_body_json(json!({ "message": "nope" })),
                )
                .mount(&server)
                .await;
            let fetched = gateway(&server).fetch_profile(&token()).await.unwrap();
            assert_eq!(fetched, None, "status {status}");
        }
    }

    #[tokio::test]
    async fn test_lookup_distinguishes_missing_from_refused() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/me"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "User not found." })))
            .mount(&server)
            .await;
        let lookup = gateway(&server).lookup_profile(&token()).await.unwrap();
        assert_eq!(lookup, ProfileLookup::Missing);

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/me"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        let lookup = gateway(&server).lookup_profile(&token()).await.unwrap();
        assert_eq!(lookup, ProfileLookup::Refused { status: 503 });
    }

    #[tokio::test]
    async fn test_find_member() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/profiles/ASHA42"))
            .and(header("authorization", "Bearer id-token-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "profileCode": "ASHA42",
                "name": "Asha"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/profiles/NOPE00"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let gateway = gateway(&server);
        let member = gateway
            .find_member(&token(), &ProfileCode::parse("asha42").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(member.name, "Asha");

        let missing = gateway
            .find_member(&token(), &ProfileCode::parse("NOPE00").unwrap())
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_submit_profile_sends_uid_and_user() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/register"))
            .and(header("authorization", "Bearer id-token-1"))
            .and(body_partial_json(json!({
                "uid": "uid-asha",
                "user": { "id": "uid-asha", "profileCode": "ASHA42" }
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "message": "User registered successfully." })),
            )
            .expect(1)
            .mount(&server)
            .await;

        gateway(&server)
            .submit_profile(&token(), &UserId::new("uid-asha"), &profile())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_submit_profile_carries_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/register"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "message": "A newer version of this profile is already stored."
            })))
            .mount(&server)
            .await;

        let err = gateway(&server)
            .submit_profile(&token(), &UserId::new("uid-asha"), &profile())
            .await
            .unwrap_err();
        assert!(err.is_stale_write());
        match err {
            GatewayError::Rejected { message, .. } => {
                assert_eq!(message, "A newer version of this profile is already stored.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_submit_profile_plain_text_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/register"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let err = gateway(&server)
            .submit_profile(&token(), &UserId::new("uid-asha"), &profile())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Rejected { status: 502, ref message } if message == "Bad Gateway"
        ));
    }
}
