//! Prometheus metrics recorder and `/metrics` rendering.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the `PrometheusHandle` used to render the `/metrics` endpoint.
/// Call once at startup before any metrics are recorded.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

// Metric name constants to avoid typos across modules.

/// Bootstrap attempts (counter).
pub const BOOTSTRAP_REQUESTS_TOTAL: &str = "bootstrap_requests_total";
/// Bootstrap attempts that ended in `StoreUnavailable` (counter).
pub const BOOTSTRAP_FAILURES_TOTAL: &str = "bootstrap_failures_total";
/// Time to open a store connection (histogram, seconds).
pub const STORE_ACQUIRE_DURATION_SECONDS: &str = "store_acquire_duration_seconds";
/// Fresh sessions started (counter).
pub const SESSIONS_CREATED_TOTAL: &str = "sessions_created_total";
/// Idle sessions removed by the sweeper (counter).
pub const SESSIONS_PURGED_TOTAL: &str = "sessions_purged_total";
