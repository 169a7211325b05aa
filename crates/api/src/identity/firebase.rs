//! Firebase ID token verification.
//!
//! - RS256 signatures checked against Google's published JWKS
//! - Signing keys cached per `kid` with a one-hour TTL (`moka`)
//! - Audience must be the project id, issuer `https://securetoken.google.com/<project id>`

use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use moka::future::Cache;
use serde::Deserialize;

use varnothsava_core::UserId;

use super::{TokenError, TokenVerifier, VerifiedToken};

/// TTL for cached signing keys (1 hour).
const JWKS_CACHE_TTL: Duration = Duration::from_secs(3600);

/// A single JSON Web Key.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key ID, matched against the JWT header's `kid`.
    pub kid: String,
    /// RSA modulus (base64url-encoded).
    pub n: String,
    /// RSA exponent (base64url-encoded).
    pub e: String,
}

#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<Jwk>,
}

/// Firebase ID token claims we read. `aud`, `iss` and `exp` are checked by
/// `jsonwebtoken` itself.
#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    sub: String,
    email: Option<String>,
}

/// Verifies Firebase ID tokens for one project.
pub struct FirebaseTokenVerifier {
    client: reqwest::Client,
    jwks_url: String,
    project_id: String,
    issuer: String,
    keys: Cache<String, Jwk>,
}

impl FirebaseTokenVerifier {
    /// Create a verifier for `project_id`, fetching keys from `jwks_url`.
    #[must_use]
    pub fn new(project_id: &str, jwks_url: &str) -> Self {
        let keys = Cache::builder()
            .max_capacity(32)
            .time_to_live(JWKS_CACHE_TTL)
            .build();

        Self {
            client: reqwest::Client::new(),
            jwks_url: jwks_url.to_string(),
            project_id: project_id.to_string(),
            issuer: format!("https://securetoken.google.com/{project_id}"),
            keys,
        }
    }

    /// Find a key by `kid`, refreshing the cache on a miss.
    async fn find_key(&self, kid: &str) -> Result<Jwk, TokenError> {
        if let Some(key) = self.keys.get(kid).await {
            return Ok(key);
        }

        self.refresh_keys().await?;

        self.keys
            .get(kid)
            .await
            .ok_or_else(|| TokenError::NoMatchingKey(kid.to_string()))
    }

    async fn refresh_keys(&self) -> Result<(), TokenError> {
        tracing::debug!(url = %self.jwks_url, "fetching signing keys");

        let response: JwksResponse = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| TokenError::KeyFetch(e.to_string()))?
            .json()
            .await
            .map_err(|e| TokenError::KeyFetch(e.to_string()))?;

        for key in response.keys {
            self.keys.insert(key.kid.clone(), key).await;
        }

        Ok(())
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "aud", "iss", "sub"]);
        validation
    }
}

#[async_trait]
impl TokenVerifier for FirebaseTokenVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedToken, TokenError> {
        let header = decode_header(token).map_err(|e| TokenError::Malformed(e.to_string()))?;
        let kid = header
            .kid
            .ok_or_else(|| TokenError::Malformed("missing kid in JWT header".to_string()))?;

        let key = self.find_key(&kid).await?;
        let decoding_key = DecodingKey::from_rsa_components(&key.n, &key.e)
            .map_err(|e| TokenError::InvalidSignature(e.to_string()))?;

        let token_data = decode::<FirebaseClaims>(token, &decoding_key, &self.validation())
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                jsonwebtoken::errors::ErrorKind::InvalidAudience => TokenError::InvalidAudience,
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => TokenError::InvalidIssuer,
                _ => TokenError::InvalidSignature(e.to_string()),
            })?;

        let claims = token_data.claims;
        if claims.sub.trim().is_empty() {
            return Err(TokenError::MissingSubject);
        }

        Ok(VerifiedToken {
            uid: UserId::new(claims.sub),
            email: claims.email,
        })
    }
}
