//! Document persistence.
//!
//! Handlers talk to a [`Repository`]; PostgreSQL backs it in production and
//! an in-memory map when no database is configured.

mod memory;
mod pool;
mod postgres;

pub use memory::MemoryRepository;
pub use pool::*;
pub use postgres::PgRepository;

use crate::error::Result;
use async_trait::async_trait;
use repairdesk_engine::{OrderRecord, ReferenceKind, RemoteReference};

/// Storage for order documents and reference entities.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Every order, oldest first.
    async fn list_orders(&self) -> Result<Vec<OrderRecord>>;

    async fn get_order(&self, id: &str) -> Result<Option<OrderRecord>>;

    /// Insert a new order. Returns `false` when the id is taken.
    async fn insert_order(&self, order: &OrderRecord) -> Result<bool>;

    /// Replace an existing order. Returns `false` when the id is unknown.
    async fn replace_order(&self, order: &OrderRecord) -> Result<bool>;

    /// Returns `false` when the id is unknown.
    async fn delete_order(&self, id: &str) -> Result<bool>;

    /// Every entity of `kind`, oldest first.
    async fn list_references(&self, kind: ReferenceKind) -> Result<Vec<RemoteReference>>;

    async fn insert_reference(&self, kind: ReferenceKind, reference: &RemoteReference) -> Result<()>;

    /// Returns `false` when the id is unknown.
    async fn update_reference(&self, kind: ReferenceKind, reference: &RemoteReference) -> Result<bool>;
}
