//! # storefront-server
//!
//! Axum HTTP server and per-request bootstrap for the storefront.
//!
//! - [`Bootstrap`]: establish/resume the session, open the store connection,
//!   fail fast with [`BootstrapError::StoreUnavailable`]
//! - [`PageRequest`]: extractor that runs the bootstrap for page handlers
//! - Fixed header markup and the plain-text failure response
//! - `/health`, `/metrics`, `/logout`
//! - Graceful shutdown via `tokio::signal` + `CancellationToken`

#![deny(unsafe_code)]

pub mod bootstrap;
pub mod extract;
pub mod health;
pub mod logging;
pub mod metrics;
pub mod page;
pub mod server;
pub mod shutdown;
pub mod sweeper;

pub use bootstrap::{Bootstrap, BootstrapError, RequestContext};
pub use extract::PageRequest;
pub use server::{AppState, StorefrontServer};
pub use shutdown::ShutdownCoordinator;
