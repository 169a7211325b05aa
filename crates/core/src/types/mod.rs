//! Core types for Varnothsava.
//!
//! This module provides type-safe wrappers for the festival domain.

pub mod email;
pub mod event;
pub mod fee;
pub mod id;
pub mod profile;
pub mod status;

pub use email::{Email, EmailError};
pub use event::{CartItem, CulturalTrack, Event, EventCategory};
pub use fee::Fee;
pub use id::*;
pub use profile::{
    NewProfile, ProfileCode, ProfileCodeError, ProfileSummary, RegisteredEvent, SOLO_TEAM_NAME,
    UserProfile,
};
pub use status::StudentType;
