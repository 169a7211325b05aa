//! Bearer-token verification.
//!
//! Handlers never look at tokens directly; the [`BearerAuth`] extractor hands
//! the raw token to the configured [`TokenVerifier`] and yields the verified
//! uid.
//!
//! [`BearerAuth`]: crate::middleware::BearerAuth

pub mod firebase;

use async_trait::async_trait;
use thiserror::Error;

use varnothsava_core::UserId;

pub use firebase::FirebaseTokenVerifier;

/// Identity proven by a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    /// Identity-provider uid (the token subject).
    pub uid: UserId,
    pub email: Option<String>,
}

/// Errors from token verification.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token expired")]
    Expired,

    #[error("token audience does not match project")]
    InvalidAudience,

    #[error("token issuer does not match project")]
    InvalidIssuer,

    #[error("invalid token signature: {0}")]
    InvalidSignature(String),

    #[error("no signing key with kid {0}")]
    NoMatchingKey(String),

    #[error("token has no subject")]
    MissingSubject,

    /// Signing keys could not be fetched. Not the caller's fault.
    #[error("failed to fetch signing keys: {0}")]
    KeyFetch(String),
}

/// Verifies bearer tokens issued by the identity provider.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verify `token` and return the identity it proves.
    async fn verify(&self, token: &str) -> Result<VerifiedToken, TokenError>;
}

#[cfg(any(test, feature = "test-support"))]
pub use static_tokens::StaticTokenVerifier;

#[cfg(any(test, feature = "test-support"))]
mod static_tokens {
    use std::collections::HashMap;

    use async_trait::async_trait;

    use varnothsava_core::UserId;

    use super::{TokenError, TokenVerifier, VerifiedToken};

    /// Verifier with a fixed token table, for tests.
    #[derive(Debug, Default, Clone)]
    pub struct StaticTokenVerifier {
        tokens: HashMap<String, VerifiedToken>,
    }

    impl StaticTokenVerifier {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Accept `token` as proof of `uid`.
        #[must_use]
        pub fn with_token(mut self, token: &str, uid: &str, email: Option<&str>) -> Self {
            self.tokens.insert(
                token.to_string(),
                VerifiedToken {
                    uid: UserId::new(uid),
                    email: email.map(String::from),
                },
            );
            self
        }
    }

    #[async_trait]
    impl TokenVerifier for StaticTokenVerifier {
        async fn verify(&self, token: &str) -> Result<VerifiedToken, TokenError> {
            self.tokens
                .get(token)
                .cloned()
                .ok_or_else(|| TokenError::InvalidSignature("unknown token".to_string()))
        }
    }
}
