//! Per-request bootstrap: session first, then the store connection.
//!
//! [`Bootstrap::initialize_request`] must succeed before any page logic
//! runs. It makes a single store connection attempt; on failure the request
//! ends with [`BootstrapError::StoreUnavailable`] and nothing else is
//! handed out. [`Bootstrap::finish_request`] is the matching scoped
//! release.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use storefront_session::{SessionContext, SessionStore, SessionToken, idle_cutoff};
use storefront_store::{StoreConnectionHandle, StoreConnector, StoreError};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::metrics::{
    BOOTSTRAP_FAILURES_TOTAL, BOOTSTRAP_REQUESTS_TOTAL, SESSIONS_CREATED_TOTAL,
    SESSIONS_PURGED_TOTAL, STORE_ACQUIRE_DURATION_SECONDS,
};
use crate::page::STORE_FAILURE_MESSAGE;

/// Upper bound on how stale a stored access time may get before an
/// otherwise unchanged session is written back.
const MAX_TOUCH_INTERVAL: Duration = Duration::from_secs(60);

/// The only way a bootstrap can fail.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The backing store could not be reached.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),
}

impl IntoResponse for BootstrapError {
    fn into_response(self) -> Response {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            STORE_FAILURE_MESSAGE,
        )
            .into_response()
    }
}

/// What page logic receives from a successful bootstrap.
#[derive(Debug)]
pub struct RequestContext {
    /// The client's session, resumed or freshly created.
    pub session: SessionContext,
    /// This request's open store connection.
    pub store: StoreConnectionHandle,
}

/// Request bootstrap shared by every handler.
pub struct Bootstrap {
    sessions: Arc<dyn SessionStore>,
    connector: Arc<dyn StoreConnector>,
    session_ttl: Duration,
    touch_every: Duration,
}

impl Bootstrap {
    /// Create a bootstrap over a session store and a store connector.
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        connector: Arc<dyn StoreConnector>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            sessions,
            connector,
            session_ttl,
            touch_every: (session_ttl / 4).min(MAX_TOUCH_INTERVAL),
        }
    }

    /// Establish the session named by `token` (if any) and open a store
    /// connection for the request.
    #[instrument(skip_all)]
    pub async fn initialize_request(
        &self,
        token: Option<&str>,
    ) -> Result<RequestContext, BootstrapError> {
        counter!(BOOTSTRAP_REQUESTS_TOTAL).increment(1);

        let session = self.establish_session(token, Utc::now()).await;

        let started = Instant::now();
        let store = match self.connector.acquire().await {
            Ok(handle) => handle,
            Err(e) => {
                counter!(BOOTSTRAP_FAILURES_TOTAL).increment(1);
                error!(
                    target_db = %self.connector.describe(),
                    error = %e,
                    "store unavailable, aborting request"
                );
                return Err(BootstrapError::StoreUnavailable(e));
            }
        };
        histogram!(STORE_ACQUIRE_DURATION_SECONDS).record(started.elapsed().as_secs_f64());

        Ok(RequestContext { session, store })
    }

    /// Release the store handle and persist the session.
    ///
    /// Returns the session so the caller can emit its cookie, or `None` if
    /// the session was ended (logout, purge) while this request ran. An
    /// unchanged session is only written back once its stored access time
    /// is a quarter TTL (at most a minute) old.
    #[instrument(skip_all, fields(handle = %ctx.store.id()))]
    pub async fn finish_request(&self, ctx: RequestContext) -> Option<SessionContext> {
        let RequestContext { mut session, store } = ctx;

        if let Err(e) = store.release().await {
            warn!(error = %e, "store handle release failed");
        }

        let now = Utc::now();
        if !session.needs_save(now, self.touch_every) {
            return Some(session);
        }
        session.touch(now);
        match self.sessions.save(&session).await {
            Ok(true) => Some(session),
            Ok(false) => {
                debug!(token = ?session.token(), "session ended during request, not restored");
                None
            }
            Err(e) => {
                warn!(error = %e, "failed to persist session");
                Some(session)
            }
        }
    }

    /// Destroy the session named by `token`. Returns whether one existed.
    pub async fn end_session(&self, token: Option<&str>) -> bool {
        let Some(token) = token.and_then(SessionToken::parse) else {
            return false;
        };
        match self.sessions.destroy(&token).await {
            Ok(existed) => {
                debug!(?token, existed, "session ended");
                existed
            }
            Err(e) => {
                warn!(error = %e, "failed to destroy session");
                false
            }
        }
    }

    /// Remove every session idle longer than the TTL. Returns the count.
    pub async fn purge_expired(&self) -> usize {
        let cutoff = idle_cutoff(Utc::now(), self.session_ttl);
        match self.sessions.purge_idle_before(cutoff).await {
            Ok(0) => 0,
            Ok(n) => {
                counter!(SESSIONS_PURGED_TOTAL).increment(n as u64);
                info!(purged = n, "expired sessions purged");
                n
            }
            Err(e) => {
                warn!(error = %e, "session purge failed");
                0
            }
        }
    }

    /// Number of stored sessions, or zero if the store cannot say.
    pub async fn active_sessions(&self) -> usize {
        self.sessions.count().await.unwrap_or_else(|e| {
            warn!(error = %e, "failed to count sessions");
            0
        })
    }

    async fn establish_session(&self, token: Option<&str>, now: DateTime<Utc>) -> SessionContext {
        if let Some(token) = token.and_then(SessionToken::parse) {
            match self.sessions.load(&token).await {
                Ok(Some(session)) if !session.is_expired(now, self.session_ttl) => {
                    debug!(?token, "session resumed");
                    return session;
                }
                Ok(Some(_)) => {
                    debug!(?token, "session expired");
                    if let Err(e) = self.sessions.destroy(&token).await {
                        warn!(error = %e, "failed to drop expired session");
                    }
                }
                Ok(None) => debug!(?token, "unknown session token"),
                Err(e) => warn!(error = %e, "session load failed, starting fresh"),
            }
        }

        counter!(SESSIONS_CREATED_TOTAL).increment(1);
        let session = SessionContext::new(SessionToken::generate(), now);
        debug!(token = ?session.token(), "session created");
        session
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
