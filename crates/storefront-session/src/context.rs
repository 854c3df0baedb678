//! Per-client session state.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::token::SessionToken;

/// Opaque per-client state keyed by a [`SessionToken`].
///
/// Created on a client's first request, read and written by page logic,
/// destroyed on expiry or logout. Values are stored as JSON so any
/// `Serialize` type can be kept across requests.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    token: SessionToken,
    created_at: DateTime<Utc>,
    last_accessed: DateTime<Utc>,
    data: Map<String, Value>,
    #[serde(skip)]
    is_new: bool,
    #[serde(skip)]
    dirty: bool,
}

impl SessionContext {
    /// Start a brand-new session at `now`.
    pub fn new(token: SessionToken, now: DateTime<Utc>) -> Self {
        Self {
            token,
            created_at: now,
            last_accessed: now,
            data: Map::new(),
            is_new: true,
            dirty: false,
        }
    }

    /// Rebuild a session from a stored record.
    pub fn restore(
        token: SessionToken,
        created_at: DateTime<Utc>,
        last_accessed: DateTime<Utc>,
        data: Map<String, Value>,
    ) -> Self {
        Self {
            token,
            created_at,
            last_accessed,
            data,
            is_new: false,
            dirty: false,
        }
    }

    /// Token naming this session.
    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    /// When the session was first created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the session was last used by a request.
    pub fn last_accessed(&self) -> DateTime<Utc> {
        self.last_accessed
    }

    /// Whether this session was created by the current request.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Whether page logic modified the stored values during this request.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// All stored values.
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Read a value, deserializing it into `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> serde_json::Result<Option<T>> {
        self.data
            .get(key)
            .map(|v| serde_json::from_value(v.clone()))
            .transpose()
    }

    /// Store a value, replacing any previous one under `key`.
    pub fn insert<T: Serialize>(&mut self, key: impl Into<String>, value: &T) -> serde_json::Result<()> {
        let value = serde_json::to_value(value)?;
        let _ = self.data.insert(key.into(), value);
        self.dirty = true;
        Ok(())
    }

    /// Remove a value, returning it if present.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let removed = self.data.remove(key);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    /// Drop every stored value but keep the session itself.
    pub fn clear(&mut self) {
        if !self.data.is_empty() {
            self.data.clear();
            self.dirty = true;
        }
    }

    /// Whether the session has been idle longer than `ttl` as of `now`.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.last_accessed < idle_cutoff(now, ttl)
    }

    /// Whether the stored record is behind this copy.
    ///
    /// True for new or modified sessions, and for sessions whose recorded
    /// access time is more than `touch_every` old. Skipping the write
    /// otherwise leaves the stored access time at most `touch_every` stale.
    pub fn needs_save(&self, now: DateTime<Utc>, touch_every: Duration) -> bool {
        self.is_new || self.dirty || self.last_accessed < idle_cutoff(now, touch_every)
    }

    /// Record that a request used this session at `now`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.last_accessed {
            self.last_accessed = now;
        }
    }
}

/// Sessions last accessed before this instant are expired.
pub fn idle_cutoff(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_sub_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
