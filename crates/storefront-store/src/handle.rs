//! Live store connections and their per-request handle.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use sqlx::MySqlConnection;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::Result;

/// One open connection to the backing store.
///
/// Only a [`StoreConnector`](crate::StoreConnector) that has completed a
/// connection hands these out.
#[async_trait]
pub trait StoreConnection: Send {
    /// Short backend name for logs (e.g. `"mysql"`).
    fn backend(&self) -> &'static str;

    /// Round-trip to the store.
    async fn ping(&mut self) -> Result<()>;

    /// Close the connection gracefully. Further calls are no-ops.
    async fn close(&mut self) -> Result<()>;

    /// The underlying MySQL connection, when this is one.
    fn as_mysql(&mut self) -> Option<&mut MySqlConnection> {
        None
    }
}

/// A request's exclusive handle to one live store connection.
///
/// Call [`release`](Self::release) when the request is done. A handle
/// dropped without release still closes its socket, but without the
/// graceful protocol goodbye, and logs a warning.
pub struct StoreConnectionHandle {
    id: Uuid,
    conn: Box<dyn StoreConnection>,
    acquired_at: Instant,
    released: bool,
}

impl StoreConnectionHandle {
    /// Wrap a freshly opened connection.
    pub fn new(conn: Box<dyn StoreConnection>) -> Self {
        let id = Uuid::now_v7();
        debug!(handle = %id, backend = conn.backend(), "store handle acquired");
        Self {
            id,
            conn,
            acquired_at: Instant::now(),
            released: false,
        }
    }

    /// Unique id of this handle, for correlating logs.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// How long the handle has been held.
    pub fn held_for(&self) -> Duration {
        self.acquired_at.elapsed()
    }

    /// The open connection.
    pub fn connection(&mut self) -> &mut dyn StoreConnection {
        &mut *self.conn
    }

    /// Shortcut for [`StoreConnection::as_mysql`].
    pub fn mysql(&mut self) -> Option<&mut MySqlConnection> {
        self.conn.as_mysql()
    }

    /// Close the connection and end the handle's lifetime.
    pub async fn release(mut self) -> Result<()> {
        self.released = true;
        let result = self.conn.close().await;
        debug!(
            handle = %self.id,
            held_ms = self.held_for().as_millis(),
            ok = result.is_ok(),
            "store handle released"
        );
        result
    }
}

impl std::fmt::Debug for StoreConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConnectionHandle")
            .field("id", &self.id)
            .field("backend", &self.conn.backend())
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

impl Drop for StoreConnectionHandle {
    fn drop(&mut self) {
        if !self.released {
            warn!(handle = %self.id, "store handle dropped without release");
        }
    }
}
