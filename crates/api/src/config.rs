//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `API_HOST` - Bind address (default: 127.0.0.1)
//! - `API_PORT` - Listen port (default: 3000)
//! - `API_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`;
//!   required in production, otherwise the in-memory profile store is used)
//! - `DEPLOY_ENV` - `production` reads the service account from the environment
//! - `FIREBASE_SERVICE_ACCOUNT_KEY` - Service account JSON (production)
//! - `FIREBASE_SERVICE_ACCOUNT_PATH` - Service account file (default: service-account.json)
//! - `FIREBASE_JWKS_URL` - Signing keys for ID tokens (default: Google securetoken JWKS)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

/// Google's published signing keys for Firebase ID tokens.
pub const DEFAULT_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Cannot read service account file {0}: {1}")]
    ServiceAccountFile(String, String),
    #[error("Invalid service account: {0}")]
    InvalidServiceAccount(String),
}

/// Where the server is deployed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeployEnv {
    Production,
    #[default]
    Development,
}

impl DeployEnv {
    fn from_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("production") => Self::Production,
            _ => Self::Development,
        }
    }
}

/// The parts of a Firebase service account the API needs.
///
/// Token verification only needs the project id; the signing keys are public.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceAccount {
    pub project_id: String,
    #[serde(default)]
    pub client_email: Option<String>,
}

impl ServiceAccount {
    /// Parse service account JSON.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidServiceAccount` if the JSON is malformed
    /// or the project id is empty.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let account: Self = serde_json::from_str(json)
            .map_err(|e| ConfigError::InvalidServiceAccount(e.to_string()))?;
        if account.project_id.trim().is_empty() {
            return Err(ConfigError::InvalidServiceAccount(
                "project_id is empty".to_string(),
            ));
        }
        Ok(account)
    }

    /// Load service account JSON from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::ServiceAccountFile(path.display().to_string(), e.to_string())
        })?;
        Self::from_json(&json)
    }
}

/// API server configuration.
#[derive(Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` connection URL (contains password)
    pub database_url: Option<SecretString>,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    pub deploy_env: DeployEnv,
    pub service_account: ServiceAccount,
    /// JWKS endpoint used to verify ID tokens
    pub jwks_url: String,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
    pub sentry_traces_sample_rate: f32,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("host", &self.host)
            .field("port", &self.port)
            .field("deploy_env", &self.deploy_env)
            .field("service_account", &self.service_account)
            .field("jwks_url", &self.jwks_url)
            .field("sentry_dsn", &self.sentry_dsn.as_ref().map(|_| "[REDACTED]"))
            .field("sentry_environment", &self.sentry_environment)
            .field("sentry_sample_rate", &self.sentry_sample_rate)
            .field("sentry_traces_sample_rate", &self.sentry_traces_sample_rate)
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is invalid or the service account
    /// cannot be loaded.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env("API_HOST", "127.0.0.1")?;
        let port = parse_env("API_PORT", "3000")?;
        let deploy_env = DeployEnv::from_value(get_optional_env("DEPLOY_ENV").as_deref());
        let database_url = require_database_in_production(
            deploy_env,
            get_database_url("API_DATABASE_URL"),
        )?;
        let service_account = load_service_account(deploy_env)?;

        Ok(Self {
            database_url,
            host,
            port,
            deploy_env,
            service_account,
            jwks_url: get_env_or_default("FIREBASE_JWKS_URL", DEFAULT_JWKS_URL),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn load_service_account(deploy_env: DeployEnv) -> Result<ServiceAccount, ConfigError> {
    match deploy_env {
        DeployEnv::Production => {
            let json = get_required_env("FIREBASE_SERVICE_ACCOUNT_KEY")?;
            ServiceAccount::from_json(&json)
        }
        DeployEnv::Development => {
            let path = get_env_or_default("FIREBASE_SERVICE_ACCOUNT_PATH", "service-account.json");
            ServiceAccount::from_file(Path::new(&path))
        }
    }
}

/// Production must not fall back to the in-memory store.
fn require_database_in_production(
    deploy_env: DeployEnv,
    database_url: Option<SecretString>,
) -> Result<Option<SecretString>, ConfigError> {
    match (deploy_env, database_url) {
        (DeployEnv::Production, None) => {
            Err(ConfigError::MissingEnvVar("API_DATABASE_URL".to_string()))
        }
        (_, url) => Ok(url),
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Option<SecretString> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(SecretString::from)
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}
