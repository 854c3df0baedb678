//! Error types for the session subsystem.

use thiserror::Error;

/// Errors that can occur while reading or writing session records.
#[derive(Debug, Error)]
pub enum SessionError {
    /// `SQLite` database error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool error.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Session payload could not be (de)serialized.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// A stored timestamp could not be parsed.
    #[error("invalid timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),

    /// Internal error (e.g. a blocking task panicked).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for session results.
pub type Result<T> = std::result::Result<T, SessionError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
