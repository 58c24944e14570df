//! The application-facing entry point.

use crate::config::SyncConfig;
use crate::filter::{filter, FilterSpec};
use crate::order::{OrderDraft, OrderRecord};
use crate::reconcile::{ReconcileReport, RetryPolicy, SyncEngine, SyncStatus};
use crate::reference::{ReferenceKind, ReferenceStore, RemoteReferenceStore, UploadReport};
use crate::remote::{HttpRemoteStore, RemoteStore};
use crate::storage::{BlobStorage, FileStorage};
use crate::store::OrderStore;
use crate::{error::Result, id};
use std::sync::Arc;
use tokio::sync::watch;

/// Local order book synced to a remote store.
///
/// All local edits go through here so the store stays the single owner of
/// the record set. Remote deletes are explicit and separate: neither a
/// local delete nor a sync pass removes anything remotely.
pub struct RepairDesk {
    store: Arc<OrderStore>,
    remote: Arc<dyn RemoteStore>,
    reference_remote: Arc<dyn RemoteReferenceStore>,
    sync: SyncEngine,
    service_centers: ReferenceStore,
    service_providers: ReferenceStore,
}

impl std::fmt::Debug for RepairDesk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepairDesk")
            .field("store", &self.store)
            .field("sync", &self.sync)
            .finish()
    }
}

impl RepairDesk {
    /// File-backed storage in `config.data_dir`, HTTP remote at `config.remote_url`.
    pub async fn open(config: SyncConfig) -> Result<Self> {
        let storage = Arc::new(FileStorage::open(&config.data_dir).await?);
        let remote = Arc::new(HttpRemoteStore::new(&config.remote_url, config.api_key.clone())?);
        tracing::info!(
            data_dir = %config.data_dir.display(),
            remote = %remote.base_url(),
            "opening repair desk"
        );
        Self::new(storage, remote, config.retry, config.concurrency).await
    }

    pub async fn new<R>(
        storage: Arc<dyn BlobStorage>,
        remote: Arc<R>,
        retry: RetryPolicy,
        concurrency: usize,
    ) -> Result<Self>
    where
        R: RemoteStore + RemoteReferenceStore + 'static,
    {
        let store = Arc::new(OrderStore::open(storage.clone()).await?);
        let service_centers = ReferenceStore::open(storage.clone(), ReferenceKind::ServiceCenter).await?;
        let service_providers = ReferenceStore::open(storage, ReferenceKind::ServiceProvider).await?;

        let orders_remote: Arc<dyn RemoteStore> = remote.clone();
        let sync = SyncEngine::with_options(store.clone(), orders_remote.clone(), retry, concurrency);

        Ok(Self {
            store,
            remote: orders_remote,
            reference_remote: remote,
            sync,
            service_centers,
            service_providers,
        })
    }

    pub fn store(&self) -> &OrderStore {
        &self.store
    }

    pub fn sync_engine(&self) -> &SyncEngine {
        &self.sync
    }

    /// Push every local record to the remote store.
    pub async fn reconcile(&self) -> ReconcileReport {
        self.sync.reconcile().await
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.sync.status()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.sync.subscribe()
    }

    pub fn cancel_retry(&self) {
        self.sync.cancel_retry()
    }

    pub async fn wait_for_settled(&self) -> Result<()> {
        self.sync.wait_for_settled().await
    }

    pub async fn list_local(&self) -> Vec<OrderRecord> {
        self.store.all().await
    }

    pub async fn get(&self, id: &str) -> Option<OrderRecord> {
        self.store.get(id).await
    }

    /// Store a new order under a freshly generated id.
    pub async fn create_order(&self, draft: OrderDraft) -> Result<OrderRecord> {
        let record = OrderRecord::from_draft(id::generate(), draft);
        self.store.create(record.clone()).await?;
        tracing::info!(id = %record.id, "order created");
        Ok(record)
    }

    /// Create or replace a local record. Returns `true` when it was new.
    pub async fn upsert_local(&self, record: OrderRecord) -> Result<bool> {
        self.store.upsert(record).await
    }

    /// Delete a local record only. Returns `false` when the id is unknown.
    pub async fn remove_local(&self, id: &str) -> Result<bool> {
        self.store.delete(id).await
    }

    /// Delete a record from the remote store only.
    pub async fn remove_remote(&self, id: &str) -> Result<()> {
        self.remote.delete(id).await?;
        tracing::info!(id = %id, "order removed remotely");
        Ok(())
    }

    pub async fn list_remote(&self) -> Result<Vec<OrderRecord>> {
        self.remote.list().await
    }

    /// Local records matching `spec`, in stored order.
    pub async fn query(&self, spec: &FilterSpec) -> Vec<OrderRecord> {
        let records = self.store.all().await;
        filter(&records, spec).into_iter().cloned().collect()
    }

    pub fn references(&self, kind: ReferenceKind) -> &ReferenceStore {
        match kind {
            ReferenceKind::ServiceCenter => &self.service_centers,
            ReferenceKind::ServiceProvider => &self.service_providers,
        }
    }

    pub async fn upload_references(&self, kind: ReferenceKind) -> Result<UploadReport> {
        self.references(kind)
            .upload_all(self.reference_remote.as_ref())
            .await
    }

    pub async fn download_references(&self, kind: ReferenceKind) -> Result<usize> {
        self.references(kind)
            .download_all(self.reference_remote.as_ref())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::tests::sample_order;
    use crate::order::{Customer, Estimate, OrderDetails, OrderStatus, Receiver};
    use crate::reference::{ReferenceDetails, ReferenceEntity};
    use crate::remote::MemoryRemote;
    use crate::storage::MemoryStorage;
    use crate::{Error, StatusFilter};

    async fn desk() -> (Arc<MemoryRemote>, RepairDesk) {
        let remote = Arc::new(MemoryRemote::new());
        let desk = RepairDesk::new(
            Arc::new(MemoryStorage::new()),
            remote.clone(),
            RetryPolicy::no_retry(),
            1,
        )
        .await
        .unwrap();
        (remote, desk)
    }

    fn draft() -> OrderDraft {
        OrderDraft {
            receiver: Receiver {
                name: "Meera".into(),
                designation: "Front desk".into(),
            },
            customer: Some(Customer {
                name: "Karan".into(),
                phone: "9000000001".into(),
                address: String::new(),
            }),
            order_details: OrderDetails {
                device_model: "Pixel 7".into(),
                ..Default::default()
            },
            estimate: Estimate {
                repair_cost: "1200".into(),
                advance_paid: "0".into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_order_assigns_id_and_defaults() {
        let (_, desk) = desk().await;
        let created = desk.create_order(draft()).await.unwrap();

        assert!(id::validate(&created.id).is_ok());
        assert_eq!(created.status(), OrderStatus::Pending);
        assert_eq!(desk.get(&created.id).await, Some(created));
    }

    #[tokio::test]
    async fn invalid_draft_is_rejected() {
        let (_, desk) = desk().await;
        let mut bad = draft();
        bad.order_details.device_model.clear();

        assert!(desk.create_order(bad).await.unwrap_err().is_validation());
        assert!(desk.list_local().await.is_empty());
    }

    #[tokio::test]
    async fn deletes_stay_on_their_side() {
        let (remote, desk) = desk().await;
        desk.upsert_local(sample_order("a1")).await.unwrap();
        desk.upsert_local(sample_order("b2")).await.unwrap();
        assert!(desk.reconcile().await.is_complete());

        assert!(desk.remove_local("a1").await.unwrap());
        desk.reconcile().await;
        assert!(remote.document("a1").await.is_some());

        desk.remove_remote("b2").await.unwrap();
        assert!(desk.get("b2").await.is_some());
        assert!(matches!(desk.remove_remote("b2").await, Err(Error::NotFound(_))));

        let remote_ids: Vec<_> = desk.list_remote().await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(remote_ids, vec!["a1"]);
    }

    #[tokio::test]
    async fn query_filters_local_records() {
        let (_, desk) = desk().await;
        let mut delivered = sample_order("b2");
        delivered.order_details.status = OrderStatus::Delivered;
        desk.upsert_local(sample_order("a1")).await.unwrap();
        desk.upsert_local(delivered).await.unwrap();

        let spec = FilterSpec::new().order_status("Delivered".parse::<StatusFilter>().unwrap());
        let found: Vec<_> = desk.query(&spec).await.into_iter().map(|r| r.id).collect();
        assert_eq!(found, vec!["b2"]);
    }

    #[tokio::test]
    async fn reference_lists_are_separate() {
        let (remote, desk) = desk().await;
        let details = ReferenceDetails {
            name: "City Service Hub".into(),
            contact: "080".into(),
            ..Default::default()
        };
        desk.references(ReferenceKind::ServiceCenter)
            .upsert_local(ReferenceEntity::new("c1", details))
            .await
            .unwrap();

        let report = desk.upload_references(ReferenceKind::ServiceCenter).await.unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(desk.download_references(ReferenceKind::ServiceProvider).await.unwrap(), 0);
        assert!(desk.references(ReferenceKind::ServiceProvider).list().await.is_empty());

        // Orders are untouched by reference uploads.
        assert!(remote.is_empty().await);
    }
}
