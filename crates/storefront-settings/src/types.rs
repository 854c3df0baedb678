//! Settings types.
//!
//! Only [`StoreConnectionConfig`] has no defaults: every field of it is
//! sourced from the environment. The remaining groups fall back to the
//! compiled defaults below.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Default MySQL port used when `DB_PORT` is unset.
pub const DEFAULT_DB_PORT: u16 = 3306;

/// Default store connect timeout in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;

/// Connection parameters for the backing relational store.
///
/// Immutable for the process lifetime once loaded.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConnectionConfig {
    /// Store host name or address.
    pub host: String,
    /// Store TCP port.
    pub port: u16,
    /// Login user.
    pub user: String,
    /// Login credential. Never serialized.
    #[serde(skip_serializing, default)]
    pub password: String,
    /// Database (schema) name.
    pub database: String,
    /// Upper bound on a single connection attempt, in milliseconds.
    pub connect_timeout_ms: u64,
}

impl StoreConnectionConfig {
    /// Connect timeout as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl fmt::Debug for StoreConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .finish()
    }
}

/// HTTP listener settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port (`0` auto-assigns).
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Where session records live.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    /// Process memory; lost on restart.
    #[default]
    Memory,
    /// `SQLite` file at [`SessionSettings::db_path`].
    Sqlite,
}

/// Session lifecycle settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSettings {
    /// Storage backend.
    pub backend: SessionBackend,
    /// Database path for the `sqlite` backend.
    pub db_path: PathBuf,
    /// Idle lifetime in seconds before a session expires.
    pub ttl_secs: u64,
    /// Name of the cookie carrying the session token.
    pub cookie_name: String,
}

impl SessionSettings {
    /// Idle lifetime as a [`Duration`].
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            backend: SessionBackend::Memory,
            db_path: PathBuf::from("sessions.db"),
            ttl_secs: 1440,
            cookie_name: "STOREFRONT_SESSID".to_string(),
        }
    }
}

/// Logging output settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Everything the storefront reads at startup.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorefrontSettings {
    /// Backing store connection parameters.
    pub store: StoreConnectionConfig,
    /// HTTP listener.
    pub server: ServerSettings,
    /// Session lifecycle.
    pub session: SessionSettings,
    /// Logging output.
    pub logging: LoggingSettings,
}

impl StorefrontSettings {
    /// Check cross-field constraints that env parsing alone cannot express.
    pub fn validate(&self) -> Result<()> {
        let name = &self.session.cookie_name;
        if name.is_empty() {
            return Err(SettingsError::InvalidValue(
                "session cookie name is empty".to_string(),
            ));
        }
        if let Some(bad) = name
            .chars()
            .find(|c| !c.is_ascii_graphic() || "()<>@,;:\\\"/[]?={}".contains(*c))
        {
            return Err(SettingsError::InvalidValue(format!(
                "session cookie name contains {bad:?}"
            )));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
