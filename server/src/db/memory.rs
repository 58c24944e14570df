//! In-memory repository, used when no database is configured.

use super::Repository;
use crate::error::Result;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use repairdesk_engine::{OrderRecord, ReferenceKind, RemoteReference};
use std::sync::atomic::{AtomicU64, Ordering};

/// A stored value tagged with its insertion sequence.
#[derive(Debug, Clone)]
struct Slot<T> {
    seq: u64,
    value: T,
}

#[derive(Debug, Default)]
pub struct MemoryRepository {
    orders: DashMap<String, Slot<OrderRecord>>,
    references: DashMap<(ReferenceKind, String), Slot<RemoteReference>>,
    seq: AtomicU64,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst)
    }
}

fn in_insertion_order<T: Clone>(mut slots: Vec<Slot<T>>) -> Vec<T> {
    slots.sort_by_key(|slot| slot.seq);
    slots.into_iter().map(|slot| slot.value).collect()
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn list_orders(&self) -> Result<Vec<OrderRecord>> {
        let slots = self.orders.iter().map(|e| e.value().clone()).collect();
        Ok(in_insertion_order(slots))
    }

    async fn get_order(&self, id: &str) -> Result<Option<OrderRecord>> {
        Ok(self.orders.get(id).map(|e| e.value().value.clone()))
    }

    async fn insert_order(&self, order: &OrderRecord) -> Result<bool> {
        match self.orders.entry(order.id.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(vacant) => {
                vacant.insert(Slot {
                    seq: self.next_seq(),
                    value: order.clone(),
                });
                Ok(true)
            }
        }
    }

    async fn replace_order(&self, order: &OrderRecord) -> Result<bool> {
        match self.orders.get_mut(&order.id) {
            Some(mut slot) => {
                slot.value = order.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_order(&self, id: &str) -> Result<bool> {
        Ok(self.orders.remove(id).is_some())
    }

    async fn list_references(&self, kind: ReferenceKind) -> Result<Vec<RemoteReference>> {
        let slots = self
            .references
            .iter()
            .filter(|e| e.key().0 == kind)
            .map(|e| e.value().clone())
            .collect();
        Ok(in_insertion_order(slots))
    }

    async fn insert_reference(&self, kind: ReferenceKind, reference: &RemoteReference) -> Result<()> {
        self.references.insert(
            (kind, reference.id.clone()),
            Slot {
                seq: self.next_seq(),
                value: reference.clone(),
            },
        );
        Ok(())
    }

    async fn update_reference(&self, kind: ReferenceKind, reference: &RemoteReference) -> Result<bool> {
        match self.references.get_mut(&(kind, reference.id.clone())) {
            Some(mut slot) => {
                slot.value = reference.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
