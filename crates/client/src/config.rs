//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `FIREBASE_API_KEY` - Web API key of the Firebase project
//!
//! ## Optional
//! - `VARNOTHSAVA_API_URL` - Profile API base URL (default: <http://127.0.0.1:3000>)
//! - `FIREBASE_AUTH_URL` - Identity Toolkit base URL
//!   (default: <https://identitytoolkit.googleapis.com/v1>)
//! - `VARNOTHSAVA_STATE_FILE` - Session snapshot file (default: .varnothsava/session.json)
//! - `VARNOTHSAVA_INSTITUTION_DOMAIN` - E-mail domain of internal students (default: sode-edu.in)
//! - `VARNOTHSAVA_CATALOG` - Event catalog JSON (default: bundled catalog)

use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_AUTH_URL: &str = "https://identitytoolkit.googleapis.com/v1";
pub const DEFAULT_STATE_FILE: &str = ".varnothsava/session.json";
pub const DEFAULT_INSTITUTION_DOMAIN: &str = "sode-edu.in";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Client configuration.
#[derive(Clone)]
pub struct ClientConfig {
    /// Profile API base URL
    pub api_url: Url,
    /// Firebase Web API key
    pub firebase_api_key: SecretString,
    /// Identity Toolkit base URL
    pub firebase_auth_url: Url,
    /// Where the session snapshot is stored
    pub state_file: PathBuf,
    /// E-mail domain that marks a student as internal
    pub institution_domain: String,
    /// Catalog override; `None` uses the bundled catalog
    pub catalog_path: Option<PathBuf>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_url", &self.api_url.as_str())
            .field("firebase_api_key", &"[REDACTED]")
            .field("firebase_auth_url", &self.firebase_auth_url.as_str())
            .field("state_file", &self.state_file)
            .field("institution_domain", &self.institution_domain)
            .field("catalog_path", &self.catalog_path)
            .finish()
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the API key is missing or a URL is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            api_url: get_url("VARNOTHSAVA_API_URL", DEFAULT_API_URL)?,
            firebase_api_key: SecretString::from(get_required_env("FIREBASE_API_KEY")?),
            firebase_auth_url: get_url("FIREBASE_AUTH_URL", DEFAULT_AUTH_URL)?,
            state_file: PathBuf::from(get_env_or_default(
                "VARNOTHSAVA_STATE_FILE",
                DEFAULT_STATE_FILE,
            )),
            institution_domain: get_env_or_default(
                "VARNOTHSAVA_INSTITUTION_DOMAIN",
                DEFAULT_INSTITUTION_DOMAIN,
            ),
            catalog_path: get_optional_env("VARNOTHSAVA_CATALOG").map(PathBuf::from),
        })
    }
}

fn get_required_env(key: &str) -> Result<String, ConfigError> {
    get_optional_env(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

fn get_url(key: &str, default: &str) -> Result<Url, ConfigError> {
    let value = get_env_or_default(key, default);
    Url::parse(&value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}
