//! MySQL connector built on `sqlx`.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::Connection;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use storefront_settings::StoreConnectionConfig;
use tracing::debug;

use crate::connector::StoreConnector;
use crate::errors::{Result, StoreError};
use crate::handle::{StoreConnection, StoreConnectionHandle};

/// Opens one unpooled MySQL connection per [`acquire`](StoreConnector::acquire).
#[derive(Clone)]
pub struct MySqlConnector {
    options: MySqlConnectOptions,
    timeout: Duration,
    target: String,
}

impl MySqlConnector {
    /// Build a connector from the startup store configuration.
    pub fn new(config: &StoreConnectionConfig) -> Self {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database);
        Self {
            options,
            timeout: config.connect_timeout(),
            target: format!(
                "mysql://{}@{}:{}/{}",
                config.user, config.host, config.port, config.database
            ),
        }
    }
}

impl fmt::Debug for MySqlConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // options carries the password
        f.debug_struct("MySqlConnector")
            .field("target", &self.target)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl StoreConnector for MySqlConnector {
    async fn acquire(&self) -> Result<StoreConnectionHandle> {
        let conn = tokio::time::timeout(self.timeout, MySqlConnection::connect_with(&self.options))
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))?
            .map_err(StoreError::Connect)?;
        debug!(target_db = %self.target, "mysql connection opened");
        Ok(StoreConnectionHandle::new(Box::new(MySqlStoreConnection {
            conn: Some(conn),
        })))
    }

    fn describe(&self) -> String {
        self.target.clone()
    }
}

/// An open MySQL connection.
struct MySqlStoreConnection {
    conn: Option<MySqlConnection>,
}

#[async_trait]
impl StoreConnection for MySqlStoreConnection {
    fn backend(&self) -> &'static str {
        "mysql"
    }

    async fn ping(&mut self) -> Result<()> {
        let conn = self.conn.as_mut().ok_or(StoreError::Closed)?;
        conn.ping().await.map_err(StoreError::Query)
    }

    async fn close(&mut self) -> Result<()> {
        match self.conn.take() {
            Some(conn) => conn.close().await.map_err(StoreError::Close),
            None => Ok(()),
        }
    }

    fn as_mysql(&mut self) -> Option<&mut MySqlConnection> {
        self.conn.as_mut()
    }
}
