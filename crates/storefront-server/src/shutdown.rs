//! Process shutdown: signal handling and draining of background tasks.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How long background tasks get to finish once shutdown starts.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared stop switch for the listener and every background task.
///
/// Clones observe the same state; cancelling any clone stops them all.
#[derive(Clone, Debug, Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// A coordinator that has not fired yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Token for tasks that should stop on shutdown.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Fire. Idempotent.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait for SIGINT or SIGTERM and fire.
    ///
    /// Returns early, without logging, if something else fires first.
    pub async fn shutdown_on_signal(&self) {
        let interrupt = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "cannot listen for SIGINT");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut stream) => {
                    let _ = stream.recv().await;
                }
                Err(e) => {
                    warn!(error = %e, "cannot listen for SIGTERM");
                    std::future::pending::<()>().await;
                }
            }
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        let signal = tokio::select! {
            () = interrupt => "SIGINT",
            () = terminate => "SIGTERM",
            () = self.token.cancelled() => return,
        };
        info!(signal, "shutdown requested");
        self.shutdown();
    }

    /// Fire, then give `tasks` up to `limit` (default 30s) to finish.
    ///
    /// Tasks still running at the deadline are aborted. Returns how many
    /// were aborted.
    pub async fn graceful_shutdown(
        &self,
        tasks: Vec<JoinHandle<()>>,
        limit: Option<Duration>,
    ) -> usize {
        let limit = limit.unwrap_or(DRAIN_TIMEOUT);
        self.shutdown();

        let aborts: Vec<_> = tasks.iter().map(JoinHandle::abort_handle).collect();
        info!(tasks = tasks.len(), ?limit, "draining background tasks");

        if tokio::time::timeout(limit, futures::future::join_all(tasks))
            .await
            .is_ok()
        {
            return 0;
        }

        let stragglers = aborts.iter().filter(|a| !a.is_finished()).count();
        for abort in &aborts {
            abort.abort();
        }
        warn!(stragglers, ?limit, "aborted tasks that outlived shutdown");
        stragglers
    }
}
