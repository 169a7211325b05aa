//! Varnothsava Core - Shared domain types.
//!
//! This crate provides the types shared by every Varnothsava component:
//! - `api` - Profile endpoints backed by the document store
//! - `client` - Session state container, profile gateway, local persistence
//! - `cli` - Migrations and the interactive festival shell
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP clients. Both the server and the client agree on the wire
//! format by serializing these types.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, e-mail, fees, profiles, events and cart items
//! - [`catalog`] - Event catalog with category/track/search filtering

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod types;

pub use catalog::{Catalog, CatalogError, CatalogGroups, EventFilter};
pub use types::*;
