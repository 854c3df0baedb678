//! Settings error types.

use thiserror::Error;

/// Errors that can occur when materializing settings from the environment.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A required environment variable is unset or empty.
    #[error("missing required environment variable: {0}")]
    Missing(String),
    /// A settings value was invalid (e.g., a malformed cookie name).
    #[error("invalid settings value: {0}")]
    InvalidValue(String),
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
