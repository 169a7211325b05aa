//! Varnothsava client library.
//!
//! Holds everything the portal's front end needs besides rendering:
//!
//! - [`session::SessionContext`]: cart, login, onboarding and profile state
//! - [`gateway`]: the profile API (`GET /api/me`, `POST /api/register`, code lookup)
//! - [`storage`]: durable key-value storage for the session snapshot
//! - [`identity`]: e-mail/password accounts with the identity provider
//! - [`catalog`]: the bundled event catalog

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod config;
pub mod gateway;
pub mod identity;
pub mod session;
pub mod storage;

pub use config::ClientConfig;
pub use gateway::{GatewayError, HttpProfileGateway, ProfileGateway, ProfileLookup};
pub use identity::{FirebaseIdentity, IdentityError, IdentityProvider, IdentitySession};
pub use session::{LoginOutcome, Receipt, SessionContext, SessionError};
pub use storage::{FileStore, KeyValueStore, MemoryStore, SessionStore, StorageError};
