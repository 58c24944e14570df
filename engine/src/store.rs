//! Store - the local, durable set of order records.
//!
//! The Store owns the in-memory collection and is the only thing allowed to
//! change it. Every mutation builds the next collection, persists it as one
//! blob, and only then swaps it in; a failed write leaves both memory and
//! storage at their previous state.

use crate::storage::{BlobStorage, ORDERS_KEY};
use crate::{error::Result, Error, OrderRecord, RecordId};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Durable keyed storage of order records.
pub struct OrderStore {
    storage: Arc<dyn BlobStorage>,
    key: String,
    records: RwLock<Vec<OrderRecord>>,
}

impl std::fmt::Debug for OrderStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderStore").field("key", &self.key).finish()
    }
}

impl OrderStore {
    /// Open the store under the default key, loading whatever is persisted.
    pub async fn open(storage: Arc<dyn BlobStorage>) -> Result<Self> {
        Self::open_with_key(storage, ORDERS_KEY).await
    }

    /// Open the store under a custom storage key.
    pub async fn open_with_key(storage: Arc<dyn BlobStorage>, key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        let records = read_records(storage.as_ref(), &key).await?;
        tracing::debug!(key = %key, count = records.len(), "opened order store");

        Ok(Self {
            storage,
            key,
            records: RwLock::new(records),
        })
    }

    /// Re-read the persisted set, replacing the in-memory copy.
    ///
    /// Returns an empty set when nothing has been stored yet; fails only when
    /// the stored blob can't be read or decoded.
    pub async fn load_all(&self) -> Result<Vec<OrderRecord>> {
        let mut guard = self.records.write().await;
        let records = read_records(self.storage.as_ref(), &self.key).await?;
        *guard = records.clone();
        Ok(records)
    }

    /// Snapshot of the current set, in insertion order.
    pub async fn all(&self) -> Vec<OrderRecord> {
        self.records.read().await.clone()
    }

    /// Get a record by ID.
    pub async fn get(&self, id: &str) -> Option<OrderRecord> {
        self.records
            .read()
            .await
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    /// Count of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Append a new record.
    pub async fn create(&self, record: OrderRecord) -> Result<()> {
        record.validate()?;

        let mut guard = self.records.write().await;
        if guard.iter().any(|r| r.id == record.id) {
            return Err(Error::DuplicateRecord(record.id));
        }

        let id = record.id.clone();
        let mut next = guard.clone();
        next.push(record);
        self.commit(&mut guard, next).await?;

        tracing::debug!(id = %id, "created order");
        Ok(())
    }

    /// Replace the record with the given id.
    ///
    /// Returns `false` without touching storage when no such record exists.
    pub async fn update(&self, id: &str, record: OrderRecord) -> Result<bool> {
        if record.id != id {
            return Err(Error::RecordIdMismatch {
                expected: id.to_string(),
                actual: record.id,
            });
        }
        record.validate()?;

        let mut guard = self.records.write().await;
        let Some(index) = guard.iter().position(|r| r.id == id) else {
            tracing::debug!(id = %id, "update matched no order");
            return Ok(false);
        };

        let mut next = guard.clone();
        next[index] = record;
        self.commit(&mut guard, next).await?;

        tracing::debug!(id = %id, "updated order");
        Ok(true)
    }

    /// Create the record, or replace it if the id already exists.
    ///
    /// Returns `true` when a new record was created.
    pub async fn upsert(&self, record: OrderRecord) -> Result<bool> {
        record.validate()?;

        let mut guard = self.records.write().await;
        let mut next = guard.clone();
        let created = match next.iter().position(|r| r.id == record.id) {
            Some(index) => {
                next[index] = record;
                false
            }
            None => {
                next.push(record);
                true
            }
        };
        self.commit(&mut guard, next).await?;
        Ok(created)
    }

    /// Remove the record with the given id.
    ///
    /// Returns `false` without touching storage when no such record exists.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let mut guard = self.records.write().await;
        if !guard.iter().any(|r| r.id == id) {
            return Ok(false);
        }

        let next: Vec<_> = guard.iter().filter(|r| r.id != id).cloned().collect();
        self.commit(&mut guard, next).await?;

        tracing::debug!(id = %id, "deleted order");
        Ok(true)
    }

    /// Remove every local record.
    pub async fn clear(&self) -> Result<()> {
        let mut guard = self.records.write().await;
        self.storage.remove_item(&self.key).await?;
        guard.clear();
        tracing::info!(key = %self.key, "cleared local orders");
        Ok(())
    }

    /// Persist `next` and, only if that succeeds, make it the live set.
    async fn commit(&self, live: &mut Vec<OrderRecord>, next: Vec<OrderRecord>) -> Result<()> {
        let blob = serde_json::to_string(&next).map_err(|e| Error::StorageWrite(e.to_string()))?;

        if let Err(e) = self.storage.set_item(&self.key, &blob).await {
            tracing::error!(key = %self.key, error = %e, "failed to persist orders; keeping previous state");
            return Err(match e {
                Error::StorageWrite(_) => e,
                other => Error::StorageWrite(other.to_string()),
            });
        }

        *live = next;
        Ok(())
    }
}

async fn read_records(storage: &dyn BlobStorage, key: &str) -> Result<Vec<OrderRecord>> {
    let Some(blob) = storage.get_item(key).await? else {
        return Ok(Vec::new());
    };

    let decoded: Vec<OrderRecord> = serde_json::from_str(&blob)
        .map_err(|e| Error::StorageCorrupt(format!("{key}: {e}")))?;

    // Ids are the key in both stores; a second copy of an id is unreachable.
    let mut seen: HashSet<RecordId> = HashSet::with_capacity(decoded.len());
    let mut records = Vec::with_capacity(decoded.len());
    for record in decoded {
        if !seen.insert(record.id.clone()) {
            tracing::warn!(id = %record.id, "ignoring duplicate stored order");
            continue;
        }
        if let Err(e) = record.validate() {
            tracing::warn!(id = %record.id, error = %e, "stored order fails validation");
        }
        records.push(record);
    }
    Ok(records)
}
