//! # keyward_core
//!
//! Core authentication domain logic for Keyward: users, credentials,
//! signed session tokens, and refresh-session bookkeeping.

pub mod auth;
pub mod clock;
pub mod migrate;
pub mod models;
pub mod uuid;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
