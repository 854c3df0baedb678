//! # storefront-settings
//!
//! Environment-sourced configuration for the storefront bootstrap.
//!
//! Settings are materialized exactly once at process start into an
//! immutable [`StorefrontSettings`] and then shared by `Arc`. Nothing reads
//! the environment per request.
//!
//! Required variables (no defaults): `DB_HOST`, `DB_USER`, `DB_PASSWORD`,
//! `DB_NAME`. Everything else has a compiled default and an optional
//! `DB_*` / `STOREFRONT_*` override.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{load_logging_settings, load_settings, load_settings_with, logging_settings_with};
pub use types::*;
