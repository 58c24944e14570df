//! # RepairDesk Engine
//!
//! Offline-first order book for a device repair shop.
//!
//! Every repair order is captured on the device first and kept in a durable
//! local store. A reconciliation pass later pushes the local set to a hosted
//! document store. The device is the source of truth: remote-only edits are
//! never pulled back automatically.
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! An [`OrderRecord`] is one repair job: who took it in, the customer, the
//! device and its reported problems, the cost estimate, where the repair
//! happens, and an intake checklist with up to four photo references. Its
//! `id` comes from [`id::generate`] and is the key in both stores.
//!
//! ### Local store
//!
//! [`OrderStore`] owns the in-memory set and persists it as one blob through
//! a [`BlobStorage`] backend on every change. A failed write leaves the
//! previous state in place.
//!
//! ### Reconciliation
//!
//! [`SyncEngine`] runs local-wins passes: create what the remote lacks,
//! overwrite what differs (compared in [`canonical`] form), skip the rest.
//! Failed records are retried with bounded exponential backoff and the
//! outcome is published as a [`SyncStatus`].
//!
//! ### Queries
//!
//! [`filter`](filter::filter) narrows the local list by service center,
//! provider, pickup day, customer and status.
//!
//! ## Quick Start
//!
//! ```rust
//! use repairdesk_engine::{
//!     FilterSpec, MemoryRemote, MemoryStorage, OrderDraft, OrderStatus, RepairDesk, RetryPolicy,
//! };
//! use std::sync::Arc;
//!
//! # tokio_test_block(async {
//! // 1. Wire a desk to storage and a remote store
//! let remote = Arc::new(MemoryRemote::new());
//! let desk = RepairDesk::new(Arc::new(MemoryStorage::new()), remote.clone(), RetryPolicy::default(), 1)
//!     .await
//!     .unwrap();
//!
//! // 2. Take in an order
//! let mut draft = OrderDraft::default();
//! draft.receiver.name = "Meera".into();
//! draft.receiver.designation = "Front desk".into();
//! draft.order_details.device_model = "Pixel 7".into();
//! draft.estimate.repair_cost = "1200".into();
//! draft.estimate.advance_paid = "200".into();
//! let order = desk.create_order(draft).await.unwrap();
//!
//! // 3. Sync
//! let report = desk.reconcile().await;
//! assert_eq!(report.created, 1);
//! assert!(remote.document(&order.id).await.is_some());
//!
//! // 4. Query
//! let pending = desk.query(&FilterSpec::new().order_status(OrderStatus::Pending)).await;
//! assert_eq!(pending.len(), 1);
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Runtime::new().unwrap().block_on(f)
//! # }
//! ```

pub mod canonical;
pub mod config;
pub mod error;
pub mod filter;
pub mod id;
pub mod order;
pub mod reconcile;
pub mod reference;
pub mod remote;
pub mod service;
pub mod storage;
pub mod store;

// Re-export main types at crate root
pub use config::SyncConfig;
pub use error::{Error, Result};
pub use filter::{FilterSpec, StatusFilter};
pub use order::{
    Customer, DeviceKyc, Estimate, OrderDetails, OrderDraft, OrderRecord, OrderStatus, Receiver,
    RepairPartner, RepairStation, Warranty,
};
pub use reconcile::{ReconcileReport, RecordOutcome, RetryPolicy, SyncEngine, SyncStatus};
pub use reference::{
    ReferenceDetails, ReferenceEntity, ReferenceKind, ReferenceStore, RemoteReference,
    RemoteReferenceStore, UploadReport,
};
pub use remote::{HttpRemoteStore, MemoryRemote, RemoteStore};
pub use service::RepairDesk;
pub use storage::{BlobStorage, FileStorage, MemoryStorage};
pub use store::OrderStore;

/// Type aliases for clarity
pub type RecordId = String;
