//! The connection acquisition seam.

use async_trait::async_trait;

use crate::errors::Result;
use crate::handle::StoreConnectionHandle;

/// Opens connections to the backing store.
///
/// `acquire` makes exactly one attempt; callers decide what a failure
/// means. Implementations never return a handle for a connection that is
/// not open.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    /// Open one connection for the calling request.
    async fn acquire(&self) -> Result<StoreConnectionHandle>;

    /// Credential-free description of the target, for logs.
    fn describe(&self) -> String;
}
