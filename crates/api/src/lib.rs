//! Varnothsava profile API library.
//!
//! Serves the two profile endpoints the festival portal syncs through
//! (`GET /api/me`, `POST /api/register`). Exposed as a library so the router
//! can be exercised in-process by tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod routes;
pub mod state;

pub use routes::app;
pub use state::AppState;
