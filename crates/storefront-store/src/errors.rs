//! Error types for store connection handling.

use std::time::Duration;

use thiserror::Error;

/// Errors raised while acquiring, using, or releasing a store connection.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store refused or failed the connection attempt.
    #[error("store connection failed: {0}")]
    Connect(#[source] sqlx::Error),

    /// The connection attempt did not finish within the configured bound.
    #[error("store connection timed out after {0:?}")]
    Timeout(Duration),

    /// A round trip on an open connection failed.
    #[error("store query failed: {0}")]
    Query(#[source] sqlx::Error),

    /// Closing the connection failed.
    #[error("store close failed: {0}")]
    Close(#[source] sqlx::Error),

    /// The connection was already closed.
    #[error("store connection already closed")]
    Closed,
}

/// Convenience type alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;
