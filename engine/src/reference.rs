//! Service centers and service providers.
//!
//! Both are small lookup lists an order's repair partner section picks from.
//! They live in their own local collections and move to and from the remote
//! store only through the explicit [`ReferenceStore::upload_all`] and
//! [`ReferenceStore::download_all`] operations; the reconciliation engine
//! never touches them.

use crate::storage::BlobStorage;
use crate::{error::Result, Error};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Which reference list an entity belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceKind {
    ServiceCenter,
    ServiceProvider,
}

impl ReferenceKind {
    pub const ALL: [ReferenceKind; 2] = [ReferenceKind::ServiceCenter, ReferenceKind::ServiceProvider];

    /// Local storage key of the collection.
    pub fn storage_key(self) -> &'static str {
        match self {
            ReferenceKind::ServiceCenter => "service_centers",
            ReferenceKind::ServiceProvider => "service_providers",
        }
    }

    /// Collection path on the remote store.
    pub fn path(self) -> &'static str {
        match self {
            ReferenceKind::ServiceCenter => "service-centers",
            ReferenceKind::ServiceProvider => "service-providers",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceKind::ServiceCenter => f.write_str("service center"),
            ReferenceKind::ServiceProvider => f.write_str("service provider"),
        }
    }
}

/// The user-editable part of a reference entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReferenceDetails {
    pub name: String,
    pub contact: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ReferenceDetails {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::MissingRequiredField("name".into()));
        }
        Ok(())
    }
}

/// A locally stored service center or provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReferenceEntity {
    pub id: String,
    #[serde(flatten)]
    pub details: ReferenceDetails,
    /// Id assigned by the remote store once the entity has been uploaded.
    pub remote_id: Option<String>,
}

impl ReferenceEntity {
    pub fn new(id: impl Into<String>, details: ReferenceDetails) -> Self {
        Self {
            id: id.into(),
            details,
            remote_id: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::MissingRequiredField("id".into()));
        }
        self.details.validate()
    }
}

/// A reference entity as the remote store returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteReference {
    pub id: String,
    #[serde(flatten)]
    pub details: ReferenceDetails,
}

/// Remote side of the reference lists.
#[async_trait]
pub trait RemoteReferenceStore: Send + Sync {
    async fn list_remote(&self, kind: ReferenceKind) -> Result<Vec<RemoteReference>>;

    /// Create an entity and return the id the remote store assigned.
    async fn create_remote(&self, kind: ReferenceKind, details: &ReferenceDetails) -> Result<String>;

    async fn update_remote(
        &self,
        kind: ReferenceKind,
        remote_id: &str,
        details: &ReferenceDetails,
    ) -> Result<()>;
}

/// Outcome of [`ReferenceStore::upload_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub created: usize,
    pub updated: usize,
}

/// Local collection of one reference kind.
pub struct ReferenceStore {
    storage: Arc<dyn BlobStorage>,
    kind: ReferenceKind,
    entities: RwLock<Vec<ReferenceEntity>>,
}

impl fmt::Debug for ReferenceStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceStore").field("kind", &self.kind).finish()
    }
}

impl ReferenceStore {
    pub async fn open(storage: Arc<dyn BlobStorage>, kind: ReferenceKind) -> Result<Self> {
        let entities = match storage.get_item(kind.storage_key()).await? {
            Some(blob) => serde_json::from_str(&blob)
                .map_err(|e| Error::StorageCorrupt(format!("{}: {e}", kind.storage_key())))?,
            None => Vec::new(),
        };

        Ok(Self {
            storage,
            kind,
            entities: RwLock::new(entities),
        })
    }

    pub fn kind(&self) -> ReferenceKind {
        self.kind
    }

    pub async fn list(&self) -> Vec<ReferenceEntity> {
        self.entities.read().await.clone()
    }

    pub async fn get(&self, id: &str) -> Option<ReferenceEntity> {
        self.entities
            .read()
            .await
            .iter()
            .find(|e| e.id == id)
            .cloned()
    }

    /// Add the entity, or replace the one with the same id.
    pub async fn upsert_local(&self, entity: ReferenceEntity) -> Result<()> {
        entity.validate()?;

        let mut guard = self.entities.write().await;
        let mut next = guard.clone();
        match next.iter().position(|e| e.id == entity.id) {
            Some(index) => next[index] = entity,
            None => next.push(entity),
        }
        self.commit(&mut guard, next).await
    }

    /// Remove the entity locally. Returns `false` when the id is unknown.
    pub async fn delete_local(&self, id: &str) -> Result<bool> {
        let mut guard = self.entities.write().await;
        if !guard.iter().any(|e| e.id == id) {
            return Ok(false);
        }
        let next = guard.iter().filter(|e| e.id != id).cloned().collect();
        self.commit(&mut guard, next).await?;
        Ok(true)
    }

    /// Push every local entity to the remote store.
    ///
    /// Entities with a remote id are updated, the rest are created and their
    /// new remote id is recorded locally. Stops at the first failure; remote
    /// ids obtained before it are kept.
    pub async fn upload_all(&self, remote: &dyn RemoteReferenceStore) -> Result<UploadReport> {
        let mut report = UploadReport::default();

        for entity in self.list().await {
            match &entity.remote_id {
                Some(remote_id) => {
                    remote
                        .update_remote(self.kind, remote_id, &entity.details)
                        .await?;
                    report.updated += 1;
                }
                None => {
                    let remote_id = remote.create_remote(self.kind, &entity.details).await?;
                    self.upsert_local(ReferenceEntity {
                        remote_id: Some(remote_id),
                        ..entity
                    })
                    .await?;
                    report.created += 1;
                }
            }
        }

        tracing::info!(
            kind = %self.kind,
            created = report.created,
            updated = report.updated,
            "uploaded reference entities"
        );
        Ok(report)
    }

    /// Copy every remote entity into the local collection.
    ///
    /// A local entity already linked to the remote id keeps its local id and
    /// takes the remote details. Unlinked remote entities are added under
    /// their remote id.
    pub async fn download_all(&self, remote: &dyn RemoteReferenceStore) -> Result<usize> {
        let fetched = remote.list_remote(self.kind).await?;

        let mut guard = self.entities.write().await;
        let mut next = guard.clone();
        for item in &fetched {
            let linked = next
                .iter()
                .position(|e| e.remote_id.as_deref() == Some(item.id.as_str()))
                .or_else(|| next.iter().position(|e| e.id == item.id));
            match linked {
                Some(index) => {
                    next[index].details = item.details.clone();
                    next[index].remote_id = Some(item.id.clone());
                }
                None => next.push(ReferenceEntity {
                    id: item.id.clone(),
                    details: item.details.clone(),
                    remote_id: Some(item.id.clone()),
                }),
            }
        }
        self.commit(&mut guard, next).await?;

        tracing::info!(kind = %self.kind, count = fetched.len(), "downloaded reference entities");
        Ok(fetched.len())
    }

    async fn commit(&self, live: &mut Vec<ReferenceEntity>, next: Vec<ReferenceEntity>) -> Result<()> {
        let blob = serde_json::to_string(&next).map_err(|e| Error::StorageWrite(e.to_string()))?;
        self.storage
            .set_item(self.kind.storage_key(), &blob)
            .await
            .map_err(|e| match e {
                Error::StorageWrite(_) => e,
                other => Error::StorageWrite(other.to_string()),
            })?;
        *live = next;
        Ok(())
    }
}
