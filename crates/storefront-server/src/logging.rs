//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber on stderr.
///
/// `RUST_LOG` wins over `level` when set. Subsequent calls are no-ops.
pub fn init_subscriber(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // try_init is a no-op if a global default is already set
    if json {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .json()
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .compact()
            .try_init();
    }
}
