//! Integration tests for Varnothsava.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p varnothsava-integration-tests
//! ```
//!
//! Every test serves the real profile router on an ephemeral port, backed
//! by the in-memory store and a fixed token table, and points the client
//! library at it. The identity provider is a mock of the Identity Toolkit
//! REST API that knows the same accounts.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use secrecy::SecretString;
use serde_json::json;
use tokio::task::JoinHandle;
use url::Url;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use varnothsava_api::AppState;
use varnothsava_api::db::MemoryProfileStore;
use varnothsava_api::identity::StaticTokenVerifier;
use varnothsava_client::{FirebaseIdentity, HttpProfileGateway};
use varnothsava_core::{Email, NewProfile};

/// An account known to both the identity mock and the API's token table.
#[derive(Debug, Clone, Copy)]
pub struct TestAccount {
    pub email: &'static str,
    pub password: &'static str,
    pub uid: &'static str,
    pub token: &'static str,
}

impl TestAccount {
    #[must_use]
    pub fn token(&self) -> SecretString {
        SecretString::from(self.token)
    }

    /// Registration form for this account.
    #[must_use]
    pub fn form(&self, name: &str) -> NewProfile {
        NewProfile {
            name: name.to_string(),
            email: Email::parse(self.email).unwrap(),
            usn: "4SO22EC017".to_string(),
            college_name: "SMVITM".to_string(),
            age: "20".to_string(),
            phone: "9845012345".to_string(),
            id_card_url: None,
        }
    }
}

/// Student at the host institution.
pub const ASHA: TestAccount = TestAccount {
    email: "asha@sode-edu.in",
    password: "asha-pass-1",
    uid: "uid-asha",
    token: "token-asha",
};

/// Student from another college.
pub const RAVI: TestAccount = TestAccount {
    email: "ravi@gmail.com",
    password: "ravi-pass-1",
    uid: "uid-ravi",
    token: "token-ravi",
};

pub const INSTITUTION_DOMAIN: &str = "sode-edu.in";

/// The profile API served on `127.0.0.1:0`.
pub struct TestServer {
    pub base_url: Url,
    pub store: Arc<MemoryProfileStore>,
    task: JoinHandle<()>,
}

impl TestServer {
    /// Serve the router with a token table for `accounts`.
    pub async fn start(accounts: &[TestAccount]) -> Self {
        let verifier = accounts
            .iter()
            .fold(StaticTokenVerifier::new(), |verifier, account| {
                verifier.with_token(account.token, account.uid, Some(account.email))
            });
        let store = Arc::new(MemoryProfileStore::new());
        let state = AppState::new(store.clone(), Arc::new(verifier));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, varnothsava_api::app(state)).await;
        });

        Self {
            base_url: Url::parse(&format!("http://{addr}")).unwrap(),
            store,
            task,
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> Url {
        self.base_url.join(path).unwrap()
    }

    #[must_use]
    pub fn gateway(&self) -> HttpProfileGateway {
        HttpProfileGateway::new(&self.base_url).unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Identity Toolkit mock that signs `accounts` in and up.
///
/// Unknown credentials get `INVALID_LOGIN_CREDENTIALS`.
pub async fn identity_provider(accounts: &[TestAccount]) -> (MockServer, FirebaseIdentity) {
    let server = MockServer::start().await;

    for account in accounts {
        let session = json!({
            "localId": account.uid,
            "email": account.email,
            "idToken": account.token,
            "refreshToken": format!("refresh-{}", account.uid),
            "expiresIn": "3600"
        });
        for endpoint in ["signInWithPassword", "signUp"] {
            Mock::given(method("POST"))
                .and(path(format!("/v1/accounts:{endpoint}")))
                .and(body_partial_json(json!({
                    "email": account.email,
                    "password": account.password
                })))
                .respond_with(ResponseTemplate::new(200).set_body_json(&session))
                .mount(&server)
                .await;
        }
    }

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "code": 400, "message": "INVALID_LOGIN_CREDENTIALS", "errors": [] }
        })))
        .with_priority(10)
        .mount(&server)
        .await;

    let base = Url::parse(&format!("{}/v1", server.uri())).unwrap();
    let identity = FirebaseIdentity::new(base, SecretString::from("integration-key"));
    (server, identity)
}
