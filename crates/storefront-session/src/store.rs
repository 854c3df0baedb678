//! The session storage seam.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::context::SessionContext;
use crate::errors::Result;
use crate::token::SessionToken;

/// Backing storage for [`SessionContext`] records.
///
/// Implementations synchronize internally; one store instance is shared by
/// every request handler.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch the session named by `token`, if one is stored.
    async fn load(&self, token: &SessionToken) -> Result<Option<SessionContext>>;

    /// Write `session` back.
    ///
    /// A new session is inserted. A resumed session only updates its
    /// existing record: if that record was destroyed in the meantime
    /// (logout, purge) nothing is written and `false` is returned.
    async fn save(&self, session: &SessionContext) -> Result<bool>;

    /// Delete the session named by `token`. Returns whether one existed.
    async fn destroy(&self, token: &SessionToken) -> Result<bool>;

    /// Delete every session last accessed before `cutoff`. Returns the count.
    async fn purge_idle_before(&self, cutoff: DateTime<Utc>) -> Result<usize>;

    /// Number of stored sessions.
    async fn count(&self) -> Result<usize>;
}
