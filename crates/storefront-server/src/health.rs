//! Liveness body for `GET /health`.

use std::time::Duration;

use serde::Serialize;

/// JSON returned by `/health`.
///
/// The store is never contacted here; a down store surfaces as 503s on page routes.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// `"ok"` whenever the process can answer.
    pub status: &'static str,
    /// Whole seconds since startup.
    pub uptime_secs: u64,
    /// Sessions currently held by the session store.
    pub active_sessions: usize,
}

impl HealthResponse {
    /// Snapshot for a process that has been up for `uptime`.
    pub fn new(uptime: Duration, active_sessions: usize) -> Self {
        Self {
            status: "ok",
            uptime_secs: uptime.as_secs(),
            active_sessions,
        }
    }
}
