//! Background removal of idle sessions.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::bootstrap::Bootstrap;

/// How often the sweeper runs by default.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Spawn a task that calls [`Bootstrap::purge_expired`] every `every`
/// until `token` is cancelled.
pub fn spawn_session_sweeper(
    bootstrap: Arc<Bootstrap>,
    every: Duration,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // Skip the immediate first tick
        let _ = ticker.tick().await;
        loop {
            tokio::select! {
                () = token.cancelled() => break,
                _ = ticker.tick() => {
                    let _ = bootstrap.purge_expired().await;
                }
            }
        }
        debug!("session sweeper stopped");
    })
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{TimeDelta, Utc};
    use storefront_session::{MemorySessionStore, SessionContext, SessionStore, SessionToken};
    use storefront_store::{StoreConnectionHandle, StoreConnector, StoreError};

    use super::*;

    struct NeverConnector;

    #[async_trait]
    impl StoreConnector for NeverConnector {
        async fn acquire(&self) -> storefront_store::Result<StoreConnectionHandle> {
            Err(StoreError::Closed)
        }

        fn describe(&self) -> String {
            "never://".to_string()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_purges_then_stops() {
        let sessions = Arc::new(MemorySessionStore::new());
        let stale = SessionContext::new(SessionToken::generate(), Utc::now() - TimeDelta::hours(2));
        assert!(sessions.save(&stale).await.unwrap());

        let bootstrap = Arc::new(Bootstrap::new(
            sessions.clone(),
            Arc::new(NeverConnector),
            Duration::from_secs(60),
        ));
        let token = CancellationToken::new();
        let handle = spawn_session_sweeper(bootstrap, Duration::from_secs(10), token.clone());

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(sessions.count().await.unwrap(), 0);

        token.cancel();
        handle.await.unwrap();
    }
}
