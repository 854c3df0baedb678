//! Settings loading from the process environment.
//!
//! Loading flow:
//! 1. Read the four required store variables (`DB_HOST`, `DB_USER`,
//!    `DB_PASSWORD`, `DB_NAME`). Any missing or empty one is an error.
//! 2. Start every other group from its compiled default.
//! 3. Apply optional `DB_*` / `STOREFRONT_*` overrides.
//! 4. Validate cross-field constraints.
//!
//! All reads go through a lookup function so the parsing is testable
//! without touching the real environment.
//!
//! Overrides that fail to parse are reported with `tracing::warn!`. Install
//! the subscriber from [`load_logging_settings`] before calling
//! [`load_settings`] so those warnings are not dropped.

use std::path::PathBuf;

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::{
    DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_DB_PORT, LoggingSettings, ServerSettings,
    SessionSettings, StoreConnectionConfig, StorefrontSettings,
};

/// Store host (required).
pub const DB_HOST: &str = "DB_HOST";
/// Store user (required).
pub const DB_USER: &str = "DB_USER";
/// Store credential (required).
pub const DB_PASSWORD: &str = "DB_PASSWORD";
/// Store database name (required).
pub const DB_NAME: &str = "DB_NAME";

/// Load settings from the real process environment.
pub fn load_settings() -> Result<StorefrontSettings> {
    load_settings_with(|name| std::env::var(name).ok())
}

/// Read only the logging group from the process environment.
///
/// Needs none of the required store variables, so the subscriber can be
/// installed before the full load runs.
pub fn load_logging_settings() -> LoggingSettings {
    logging_settings_with(|name| std::env::var(name).ok())
}

/// [`load_logging_settings`] through an arbitrary variable lookup.
pub fn logging_settings_with<F>(lookup: F) -> LoggingSettings
where
    F: Fn(&str) -> Option<String>,
{
    let mut logging = LoggingSettings::default();
    apply_logging_overrides(&Env { lookup }, &mut logging);
    logging
}

/// Load settings through an arbitrary variable lookup.
pub fn load_settings_with<F>(lookup: F) -> Result<StorefrontSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let env = Env { lookup };

    let store = StoreConnectionConfig {
        host: env.required(DB_HOST)?,
        port: env
            .u16_in("DB_PORT", 1, 65535)
            .unwrap_or(DEFAULT_DB_PORT),
        user: env.required(DB_USER)?,
        password: env.required(DB_PASSWORD)?,
        database: env.required(DB_NAME)?,
        connect_timeout_ms: env
            .u64_in("DB_CONNECT_TIMEOUT_MS", 100, 60_000)
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_MS),
    };

    let mut settings = StorefrontSettings {
        store,
        server: ServerSettings::default(),
        session: SessionSettings::default(),
        logging: LoggingSettings::default(),
    };
    apply_overrides(&env, &mut settings);
    settings.validate()?;

    debug!(
        host = %settings.store.host,
        port = settings.store.port,
        database = %settings.store.database,
        session_backend = ?settings.session.backend,
        "settings loaded"
    );
    Ok(settings)
}

fn apply_overrides<F>(env: &Env<F>, settings: &mut StorefrontSettings)
where
    F: Fn(&str) -> Option<String>,
{
    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = env.string("STOREFRONT_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = env.u16_in("STOREFRONT_PORT", 0, 65535) {
        settings.server.port = v;
    }

    // ── Session ─────────────────────────────────────────────────────
    if let Some(v) = env.string("STOREFRONT_SESSION_BACKEND") {
        match serde_json::from_value(Value::String(v.to_lowercase())) {
            Ok(backend) => settings.session.backend = backend,
            Err(_) => {
                tracing::warn!(
                    key = "STOREFRONT_SESSION_BACKEND",
                    value = %v,
                    "unknown session backend, ignoring"
                );
            }
        }
    }
    if let Some(v) = env.string("STOREFRONT_SESSION_DB") {
        settings.session.db_path = PathBuf::from(v);
    }
    if let Some(v) = env.u64_in("STOREFRONT_SESSION_TTL_SECS", 60, 604_800) {
        settings.session.ttl_secs = v;
    }
    if let Some(v) = env.string("STOREFRONT_SESSION_COOKIE") {
        settings.session.cookie_name = v;
    }

    apply_logging_overrides(env, &mut settings.logging);
}

fn apply_logging_overrides<F>(env: &Env<F>, logging: &mut LoggingSettings)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = env.string("STOREFRONT_LOG_LEVEL") {
        logging.level = v;
    }
    if let Some(v) = env.bool("STOREFRONT_LOG_JSON") {
        logging.json = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Variable readers (thin wrappers over the lookup) ────────────────────────

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn required(&self, name: &str) -> Result<String> {
        self.string(name)
            .ok_or_else(|| SettingsError::Missing(name.to_string()))
    }

    fn bool(&self, name: &str) -> Option<bool> {
        let val = self.string(name)?;
        let result = parse_bool(&val);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
        }
        result
    }

    fn u16_in(&self, name: &str, min: u16, max: u16) -> Option<u16> {
        let val = self.string(name)?;
        let result = parse_u16_range(&val, min, max);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid u16 env var, ignoring");
        }
        result
    }

    fn u64_in(&self, name: &str, min: u64, max: u64) -> Option<u64> {
        let val = self.string(name)?;
        let result = parse_u64_range(&val, min, max);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
        }
        result
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
