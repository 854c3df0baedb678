//! `SQLite`-backed session store.
//!
//! Records survive restarts and can be shared by several storefront
//! processes on one host. All `rusqlite` calls run on the blocking pool.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds,
//! `Z` suffix) so that idle purges can compare them lexicographically.

pub mod connection;

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{OptionalExtension, params};
use serde_json::{Map, Value};
use tracing::debug;

use crate::context::SessionContext;
use crate::errors::{Result, SessionError};
use crate::store::SessionStore;
use crate::token::SessionToken;

pub use connection::{ConnectionConfig, ConnectionPool};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sessions (
    token         TEXT PRIMARY KEY,
    data          TEXT NOT NULL,
    created_at    TEXT NOT NULL,
    last_accessed TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_sessions_last_accessed ON sessions(last_accessed);
";

/// Session store persisted in a `SQLite` database.
#[derive(Clone)]
pub struct SqliteSessionStore {
    pool: ConnectionPool,
}

impl SqliteSessionStore {
    /// Open (or create) the session database at `path`.
    pub fn open(path: &Path, config: &ConnectionConfig) -> Result<Self> {
        Self::with_pool(connection::new_file(path, config)?)
    }

    /// Open a private in-memory session database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        Self::with_pool(connection::new_in_memory(&ConnectionConfig::default())?)
    }

    /// Wrap an existing pool, creating the schema if needed.
    pub fn with_pool(pool: ConnectionPool) -> Result<Self> {
        let conn = pool.get()?;
        conn.execute_batch(SCHEMA)?;
        debug!("session schema ready");
        Ok(Self { pool })
    }

    async fn run<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Connection) -> Result<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            op(&conn)
        })
        .await
        .map_err(|e| SessionError::Internal(format!("session task failed: {e}")))?
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn load(&self, token: &SessionToken) -> Result<Option<SessionContext>> {
        let token = token.clone();
        self.run(move |conn| {
            let row = conn
                .query_row(
                    "SELECT data, created_at, last_accessed FROM sessions WHERE token = ?1",
                    params![token.as_str()],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                        ))
                    },
                )
                .optional()?;
            let Some((data, created_at, last_accessed)) = row else {
                return Ok(None);
            };
            let data: Map<String, Value> = serde_json::from_str(&data)?;
            Ok(Some(SessionContext::restore(
                token,
                parse_timestamp(&created_at)?,
                parse_timestamp(&last_accessed)?,
                data,
            )))
        })
        .await
    }

    async fn save(&self, session: &SessionContext) -> Result<bool> {
        let token = session.token().clone();
        let data = serde_json::to_string(session.data())?;
        let created_at = timestamp(session.created_at());
        let last_accessed = timestamp(session.last_accessed());
        let is_new = session.is_new();
        self.run(move |conn| {
            let n = if is_new {
                conn.execute(
                    "INSERT INTO sessions (token, data, created_at, last_accessed)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(token) DO UPDATE SET
                         data = excluded.data,
                         last_accessed = excluded.last_accessed",
                    params![token.as_str(), data, created_at, last_accessed],
                )?
            } else {
                conn.execute(
                    "UPDATE sessions SET data = ?2, last_accessed = ?3 WHERE token = ?1",
                    params![token.as_str(), data, last_accessed],
                )?
            };
            Ok(n > 0)
        })
        .await
    }

    async fn destroy(&self, token: &SessionToken) -> Result<bool> {
        let token = token.clone();
        self.run(move |conn| {
            let n = conn.execute(
                "DELETE FROM sessions WHERE token = ?1",
                params![token.as_str()],
            )?;
            Ok(n > 0)
        })
        .await
    }

    async fn purge_idle_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let cutoff = timestamp(cutoff);
        self.run(move |conn| {
            let n = conn.execute(
                "DELETE FROM sessions WHERE last_accessed < ?1",
                params![cutoff],
            )?;
            Ok(n)
        })
        .await
    }

    async fn count(&self) -> Result<usize> {
        self.run(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
            Ok(usize::try_from(n).unwrap_or(0))
        })
        .await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[tokio::test]
    async fn save_then_load_round_trips_values() {
        let store = SqliteSessionStore::open_in_memory().unwrap();
        let mut s = SessionContext::new(SessionToken::generate(), at(0));
        s.insert("cart", &serde_json::json!({"sku-1": 2})).unwrap();
        assert!(store.save(&s).await.unwrap());

        let loaded = store.load(s.token()).await.unwrap().unwrap();
        assert!(!loaded.is_new());
        assert_eq!(loaded.created_at(), at(0));
        assert_eq!(loaded.data(), s.data());
    }

    #[tokio::test]
    async fn save_updates_access_time_but_not_creation() {
        let store = SqliteSessionStore::open_in_memory().unwrap();
        let mut s = SessionContext::new(SessionToken::generate(), at(0));
        assert!(store.save(&s).await.unwrap());
        s.touch(at(30));
        assert!(store.save(&s).await.unwrap());

        let loaded = store.load(s.token()).await.unwrap().unwrap();
        assert_eq!(loaded.created_at(), at(0));
        assert_eq!(loaded.last_accessed(), at(30));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn resumed_session_updates_only_existing_rows() {
        let store = SqliteSessionStore::open_in_memory().unwrap();
        let s = SessionContext::new(SessionToken::generate(), at(0));
        assert!(store.save(&s).await.unwrap());

        let mut resumed = store.load(s.token()).await.unwrap().unwrap();
        resumed.touch(at(20));
        assert!(store.save(&resumed).await.unwrap());
        assert_eq!(
            store.load(s.token()).await.unwrap().unwrap().last_accessed(),
            at(20)
        );

        assert!(store.destroy(s.token()).await.unwrap());
        assert!(!store.save(&resumed).await.unwrap());
        assert!(store.load(s.token()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_token_loads_none() {
        let store = SqliteSessionStore::open_in_memory().unwrap();
        assert!(store.load(&SessionToken::generate()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn destroy_and_purge() {
        let store = SqliteSessionStore::open_in_memory().unwrap();
        let a = SessionContext::new(SessionToken::generate(), at(0));
        let b = SessionContext::new(SessionToken::generate(), at(10));
        let c = SessionContext::new(SessionToken::generate(), at(100));
        for s in [&a, &b, &c] {
            assert!(store.save(s).await.unwrap());
        }

        assert!(store.destroy(a.token()).await.unwrap());
        assert!(!store.destroy(a.token()).await.unwrap());
        assert_eq!(store.purge_idle_before(at(50)).await.unwrap(), 1);
        assert!(store.load(c.token()).await.unwrap().is_some());
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.db");
        let s = SessionContext::new(SessionToken::generate(), at(0));
        {
            let store = SqliteSessionStore::open(&path, &ConnectionConfig::default()).unwrap();
            assert!(store.save(&s).await.unwrap());
        }
        let store = SqliteSessionStore::open(&path, &ConnectionConfig::default()).unwrap();
        assert!(store.load(s.token()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn corrupt_payload_is_a_serde_error() {
        let store = SqliteSessionStore::open_in_memory().unwrap();
        let token = SessionToken::generate();
        {
            let conn = store.pool.get().unwrap();
            let _ = conn
                .execute(
                    "INSERT INTO sessions VALUES (?1, 'not json', ?2, ?2)",
                    params![token.as_str(), timestamp(at(0))],
                )
                .unwrap();
        }
        assert_matches!(store.load(&token).await, Err(SessionError::Serde(_)));
    }

    #[test]
    fn timestamps_are_fixed_width() {
        assert_eq!(timestamp(at(0)).len(), timestamp(at(123_456)).len());
        assert_eq!(parse_timestamp(&timestamp(at(7))).unwrap(), at(7));
    }
}
