//! # storefront-store
//!
//! Per-request connections to the storefront's relational store.
//!
//! A [`StoreConnector`] makes one connection attempt per call and yields a
//! [`StoreConnectionHandle`] only when the connection is open. The handle is
//! owned by a single request and released explicitly when it finishes.

#![deny(unsafe_code)]

pub mod connector;
pub mod errors;
pub mod handle;
pub mod mysql;

pub use connector::StoreConnector;
pub use errors::{Result, StoreError};
pub use handle::{StoreConnection, StoreConnectionHandle};
pub use mysql::MySqlConnector;
