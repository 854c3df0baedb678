//! # storefront
//!
//! Storefront server binary. Loads settings from the environment, wires the
//! session store and store connector into the request bootstrap, and serves
//! HTTP until SIGINT/SIGTERM.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use storefront_server::sweeper::{DEFAULT_SWEEP_INTERVAL, spawn_session_sweeper};
use storefront_server::{Bootstrap, StorefrontServer, logging, metrics};
use storefront_session::sqlite::ConnectionConfig;
use storefront_session::{MemorySessionStore, SessionStore, SqliteSessionStore};
use storefront_settings::{SessionBackend, StorefrontSettings};
use storefront_store::{MySqlConnector, StoreConnector};

/// Storefront server.
#[derive(Parser, Debug)]
#[command(name = "storefront", about = "Storefront server")]
struct Cli {
    /// Host to bind (overrides `STOREFRONT_HOST`).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides `STOREFRONT_PORT`).
    #[arg(long)]
    port: Option<u16>,

    /// Persist sessions in this `SQLite` file instead of memory.
    #[arg(long)]
    session_db: Option<PathBuf>,
}

impl Cli {
    /// Fold command-line overrides into the environment settings.
    fn apply(self, settings: &mut StorefrontSettings) {
        if let Some(host) = self.host {
            settings.server.host = host;
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(path) = self.session_db {
            settings.session.backend = SessionBackend::Sqlite;
            settings.session.db_path = path;
        }
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

fn open_session_store(settings: &StorefrontSettings) -> Result<Arc<dyn SessionStore>> {
    match settings.session.backend {
        SessionBackend::Memory => Ok(Arc::new(MemorySessionStore::new())),
        SessionBackend::Sqlite => {
            let path = &settings.session.db_path;
            ensure_parent_dir(path)?;
            let store = SqliteSessionStore::open(path, &ConnectionConfig::default())
                .with_context(|| format!("Failed to open session database: {}", path.display()))?;
            Ok(Arc::new(store))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    // load_settings warns on ignored values; the subscriber must exist first
    let log = storefront_settings::load_logging_settings();
    logging::init_subscriber(&log.level, log.json);

    let mut settings =
        storefront_settings::load_settings().context("Failed to load settings")?;
    args.apply(&mut settings);
    settings.validate().context("Invalid settings")?;

    let sessions = open_session_store(&settings)?;
    let connector = MySqlConnector::new(&settings.store);
    tracing::info!(
        store = %connector.describe(),
        sessions = ?settings.session.backend,
        "storefront configured"
    );

    let bootstrap = Arc::new(Bootstrap::new(
        sessions,
        Arc::new(connector),
        settings.session.ttl(),
    ));

    let mut server = StorefrontServer::new(
        settings.server.clone(),
        bootstrap.clone(),
        &settings.session.cookie_name,
    );
    match metrics::install_recorder() {
        Ok(handle) => server = server.with_metrics(handle),
        Err(e) => tracing::warn!(error = %e, "metrics recorder not installed"),
    }
    let server = Arc::new(server);

    let listener = server.bind().await.with_context(|| {
        format!(
            "Failed to bind {}:{}",
            settings.server.host, settings.server.port
        )
    })?;

    let shutdown = server.shutdown().clone();
    let sweeper = spawn_session_sweeper(bootstrap, DEFAULT_SWEEP_INTERVAL, shutdown.token());
    let signals = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { shutdown.shutdown_on_signal().await })
    };

    let served = server.serve(listener).await;

    tracing::info!("Shutting down...");
    let _ = shutdown
        .graceful_shutdown(vec![sweeper, signals], None)
        .await;
    served.context("Server error")?;

    tracing::info!("Shutdown complete");
    Ok(())
}
