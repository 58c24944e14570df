//! In-process remote store with fault injection.

use super::RemoteStore;
use crate::reference::{ReferenceDetails, ReferenceKind, RemoteReference, RemoteReferenceStore};
use crate::{error::Result, Error, OrderRecord, RecordId};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Mutex;

/// How many times each remote operation was attempted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub get: usize,
    pub create: usize,
    pub update: usize,
    pub delete: usize,
}

impl CallCounts {
    /// Number of calls that could have written to the store.
    pub fn writes(&self) -> usize {
        self.create + self.update + self.delete
    }
}

#[derive(Debug, Clone, Copy)]
enum Fault {
    Times(u32),
    Always,
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Get,
    Create,
    Update,
    Delete,
}

/// Remote store held in memory.
///
/// Tests can make calls for a given id fail with a network error, take the
/// whole store offline, and inspect how often each operation was attempted.
#[derive(Debug, Default)]
pub struct MemoryRemote {
    orders: Mutex<BTreeMap<RecordId, OrderRecord>>,
    references: Mutex<HashMap<ReferenceKind, BTreeMap<String, ReferenceDetails>>>,
    faults: Mutex<HashMap<RecordId, Fault>>,
    calls: Mutex<HashMap<RecordId, CallCounts>>,
    offline: AtomicBool,
    next_reference: AtomicU64,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a document directly, without counting a call.
    pub async fn seed(&self, record: OrderRecord) {
        self.orders.lock().await.insert(record.id.clone(), record);
    }

    /// Read a document directly, without counting a call.
    pub async fn document(&self, id: &str) -> Option<OrderRecord> {
        self.orders.lock().await.get(id).cloned()
    }

    /// Number of stored order documents.
    pub async fn len(&self) -> usize {
        self.orders.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Fail the next `times` calls that touch `id`.
    pub async fn fail_times(&self, id: &str, times: u32) {
        if times == 0 {
            return;
        }
        self.faults
            .lock()
            .await
            .insert(id.to_string(), Fault::Times(times));
    }

    /// Fail every call that touches `id` until [`clear_faults`](Self::clear_faults).
    pub async fn fail_always(&self, id: &str) {
        self.faults.lock().await.insert(id.to_string(), Fault::Always);
    }

    pub async fn clear_faults(&self) {
        self.faults.lock().await.clear();
    }

    /// Fail every call, as if the network were down.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Calls attempted for one record id.
    pub async fn calls_for(&self, id: &str) -> CallCounts {
        self.calls.lock().await.get(id).copied().unwrap_or_default()
    }

    /// Calls attempted across all record ids.
    pub async fn total_calls(&self) -> CallCounts {
        self.calls
            .lock()
            .await
            .values()
            .fold(CallCounts::default(), |acc, c| CallCounts {
                get: acc.get + c.get,
                create: acc.create + c.create,
                update: acc.update + c.update,
                delete: acc.delete + c.delete,
            })
    }

    pub async fn reset_calls(&self) {
        self.calls.lock().await.clear();
    }

    /// Count the call, then apply any injected fault.
    async fn enter(&self, id: &str, op: Op) -> Result<()> {
        {
            let mut calls = self.calls.lock().await;
            let counts = calls.entry(id.to_string()).or_default();
            match op {
                Op::Get => counts.get += 1,
                Op::Create => counts.create += 1,
                Op::Update => counts.update += 1,
                Op::Delete => counts.delete += 1,
            }
        }

        self.check_online()?;

        let mut faults = self.faults.lock().await;
        let exhausted = match faults.get_mut(id) {
            None => return Ok(()),
            Some(Fault::Always) => false,
            Some(Fault::Times(remaining)) => {
                *remaining = remaining.saturating_sub(1);
                *remaining == 0
            }
        };
        if exhausted {
            faults.remove(id);
        }
        Err(Error::Network(format!("injected failure for {id}")))
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network("remote store unreachable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn create(&self, record: &OrderRecord) -> Result<()> {
        self.enter(&record.id, Op::Create).await?;
        let mut orders = self.orders.lock().await;
        if orders.contains_key(&record.id) {
            return Err(Error::Conflict(record.id.clone()));
        }
        orders.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<OrderRecord>> {
        self.enter(id, Op::Get).await?;
        Ok(self.orders.lock().await.get(id).cloned())
    }

    async fn update(&self, id: &str, record: &OrderRecord) -> Result<()> {
        self.enter(id, Op::Update).await?;
        let mut orders = self.orders.lock().await;
        match orders.get_mut(id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(Error::NotFound(id.to_string())),
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.enter(id, Op::Delete).await?;
        match self.orders.lock().await.remove(id) {
            Some(_) => Ok(()),
            None => Err(Error::NotFound(id.to_string())),
        }
    }

    async fn list(&self) -> Result<Vec<OrderRecord>> {
        self.check_online()?;
        Ok(self.orders.lock().await.values().cloned().collect())
    }
}

#[async_trait]
impl RemoteReferenceStore for MemoryRemote {
    async fn list_remote(&self, kind: ReferenceKind) -> Result<Vec<RemoteReference>> {
        self.check_online()?;
        let references = self.references.lock().await;
        Ok(references
            .get(&kind)
            .map(|entries| {
                entries
                    .iter()
                    .map(|(id, details)| RemoteReference {
                        id: id.clone(),
                        details: details.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create_remote(&self, kind: ReferenceKind, details: &ReferenceDetails) -> Result<String> {
        self.check_online()?;
        let n = self.next_reference.fetch_add(1, Ordering::SeqCst) + 1;
        let remote_id = format!("ref{n}");
        self.references
            .lock()
            .await
            .entry(kind)
            .or_default()
            .insert(remote_id.clone(), details.clone());
        Ok(remote_id)
    }

    async fn update_remote(
        &self,
        kind: ReferenceKind,
        remote_id: &str,
        details: &ReferenceDetails,
    ) -> Result<()> {
        self.check_online()?;
        let mut references = self.references.lock().await;
        match references.get_mut(&kind).and_then(|e| e.get_mut(remote_id)) {
            Some(existing) => {
                *existing = details.clone();
                Ok(())
            }
            None => Err(Error::NotFound(remote_id.to_string())),
        }
    }
}
