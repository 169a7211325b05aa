//! HTTP middleware stack for the API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions; added in `main`)
//! 2. `TraceLayer` (request span with `request_id` and `uid` fields)
//! 3. Request ID (add unique ID to each request)
//!
//! Authentication is not a layer: handlers opt in with the [`BearerAuth`]
//! extractor.

pub mod auth;
pub mod request_id;

pub use auth::BearerAuth;
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
