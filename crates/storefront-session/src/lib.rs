//! # storefront-session
//!
//! Per-client session state for the storefront.
//!
//! - [`SessionToken`]: random bearer token carried in the session cookie
//! - [`SessionContext`]: the per-client values page logic reads and writes
//! - [`SessionStore`]: storage seam, with [`MemorySessionStore`] and
//!   [`SqliteSessionStore`] implementations
//!
//! Sessions are passed explicitly to request handlers; there is no ambient
//! "current session".

#![deny(unsafe_code)]

pub mod context;
pub mod errors;
pub mod memory;
pub mod sqlite;
pub mod store;
pub mod token;

pub use context::{SessionContext, idle_cutoff};
pub use errors::{Result, SessionError};
pub use memory::MemorySessionStore;
pub use sqlite::SqliteSessionStore;
pub use store::SessionStore;
pub use token::SessionToken;
