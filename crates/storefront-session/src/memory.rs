//! In-process session store backed by `DashMap`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::context::SessionContext;
use crate::errors::Result;
use crate::store::SessionStore;
use crate::token::SessionToken;

/// Session store that keeps every record in process memory.
///
/// Records do not survive a restart.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: DashMap<SessionToken, SessionContext>,
}

impl MemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, token: &SessionToken) -> Result<Option<SessionContext>> {
        Ok(self.sessions.get(token).map(|entry| {
            let s = entry.value();
            SessionContext::restore(
                s.token().clone(),
                s.created_at(),
                s.last_accessed(),
                s.data().clone(),
            )
        }))
    }

    async fn save(&self, session: &SessionContext) -> Result<bool> {
        if session.is_new() {
            let _ = self
                .sessions
                .insert(session.token().clone(), session.clone());
            return Ok(true);
        }
        Ok(match self.sessions.get_mut(session.token()) {
            Some(mut entry) => {
                *entry = session.clone();
                true
            }
            None => false,
        })
    }

    async fn destroy(&self, token: &SessionToken) -> Result<bool> {
        Ok(self.sessions.remove(token).is_some())
    }

    async fn purge_idle_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.last_accessed() >= cutoff);
        Ok(before.saturating_sub(self.sessions.len()))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.sessions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[tokio::test]
    async fn load_missing_is_none() {
        let store = MemorySessionStore::new();
        let loaded = store.load(&SessionToken::generate()).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn save_then_load_restores_values() {
        let store = MemorySessionStore::new();
        let mut s = SessionContext::new(SessionToken::generate(), at(0));
        s.insert("user.id", &"u-1").unwrap();
        assert!(store.save(&s).await.unwrap());

        let loaded = store.load(s.token()).await.unwrap().unwrap();
        assert!(!loaded.is_new());
        assert!(!loaded.is_dirty());
        assert_eq!(loaded.get::<String>("user.id").unwrap().as_deref(), Some("u-1"));
    }

    #[tokio::test]
    async fn destroyed_session_is_not_recreated_by_save() {
        let store = MemorySessionStore::new();
        let s = SessionContext::new(SessionToken::generate(), at(0));
        assert!(store.save(&s).await.unwrap());

        let mut resumed = store.load(s.token()).await.unwrap().unwrap();
        assert!(store.destroy(s.token()).await.unwrap());
        resumed.insert("cart", &1).unwrap();

        assert!(!store.save(&resumed).await.unwrap());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn destroy_reports_existence() {
        let store = MemorySessionStore::new();
        let s = SessionContext::new(SessionToken::generate(), at(0));
        assert!(store.save(&s).await.unwrap());
        assert!(store.destroy(s.token()).await.unwrap());
        assert!(!store.destroy(s.token()).await.unwrap());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn purge_removes_only_idle_sessions() {
        let store = MemorySessionStore::new();
        let old = SessionContext::new(SessionToken::generate(), at(0));
        let fresh = SessionContext::new(SessionToken::generate(), at(100));
        assert!(store.save(&old).await.unwrap());
        assert!(store.save(&fresh).await.unwrap());

        let purged = store.purge_idle_before(at(50)).await.unwrap();
        assert_eq!(purged, 1);
        assert!(store.load(old.token()).await.unwrap().is_none());
        assert!(store.load(fresh.token()).await.unwrap().is_some());
    }
}
