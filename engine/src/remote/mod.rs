//! Remote document store interface.
//!
//! The hosted store addresses order documents by `OrderRecord::id`, never by
//! a server-generated key, so create, lookup and update all hit the same
//! logical record from any device. Implementations have no retry or backoff
//! of their own; that belongs to the reconciliation engine.

mod http;
mod memory;

pub use http::HttpRemoteStore;
pub use memory::{CallCounts, MemoryRemote};

use crate::{error::Result, OrderRecord};
use async_trait::async_trait;

/// CRUD access to order documents in the remote store.
///
/// Every call may fail with [`Error::Network`](crate::Error::Network).
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Create a document. Fails with `Conflict` when the id already exists.
    async fn create(&self, record: &OrderRecord) -> Result<()>;

    /// Fetch a document; `None` when the id is unknown remotely.
    async fn get(&self, id: &str) -> Result<Option<OrderRecord>>;

    /// Replace a document. Fails with `NotFound` when the id is unknown.
    async fn update(&self, id: &str, record: &OrderRecord) -> Result<()>;

    /// Delete a document. Fails with `NotFound` when the id is unknown.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Every order document currently stored remotely.
    async fn list(&self) -> Result<Vec<OrderRecord>>;
}
