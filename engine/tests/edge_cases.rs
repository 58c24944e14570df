//! Edge case tests for repairdesk-engine
//!
//! These tests cover boundary conditions and unusual inputs.

use repairdesk_engine::{
    canonical, BlobStorage, Error, FileStorage, HttpRemoteStore, MemoryStorage, OrderRecord,
    OrderStatus, OrderStore, RepairDesk, RetryPolicy, SyncConfig, SyncEngine,
};
use serde_json::json;
use std::sync::Arc;

fn minimal_document(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "receiver": {"name": "Meera", "designation": "Front desk"},
        "orderDetails": {"deviceModel": "iPhone 12"},
        "estimate": {"repairCost": "0", "advancePaid": "0"}
    })
}

// ============================================================================
// Wire Format Edge Cases
// ============================================================================

#[test]
fn legacy_field_names_and_numeric_amounts() {
    let doc = json!({
        "id": "legacy1",
        "receiver": {"name": "Meera", "designation": "Front desk"},
        "customer": {"name": "Karan", "number": "9000000001"},
        "orderDetails": {"deviceModel": "iPhone 12", "orderStatus": "Repaired"},
        "estimate": {"repairCost": 1500, "advancePaid": 250.5}
    });

    let record: OrderRecord = serde_json::from_value(doc).unwrap();
    assert_eq!(record.customer.as_ref().unwrap().phone, "9000000001");
    assert_eq!(record.status(), OrderStatus::Repaired);
    assert_eq!(record.estimate.repair_cost, "1500");
    assert_eq!(record.estimate.advance_paid, "250.5");
    assert!(record.validate().is_ok());
}

#[test]
fn missing_sections_default() {
    let record: OrderRecord = serde_json::from_value(json!({"id": "bare"})).unwrap();
    assert!(record.customer.is_none());
    assert_eq!(record.status(), OrderStatus::Pending);
    assert_eq!(record.device_kyc.photos, [None, None, None, None]);

    // Required fields are enforced at the store boundary, not by decoding.
    assert!(matches!(record.validate(), Err(Error::MissingRequiredField(_))));
}

#[test]
fn short_photo_list_is_padded() {
    let mut doc = minimal_document("p1");
    doc["deviceKyc"] = json!({"photos": ["file:///a.jpg", ""]});

    let record: OrderRecord = serde_json::from_value(doc).unwrap();
    assert_eq!(
        record.device_kyc.photos,
        [Some("file:///a.jpg".to_string()), None, None, None]
    );
}

#[test]
fn too_many_photos_rejected() {
    let mut doc = minimal_document("p2");
    doc["deviceKyc"] = json!({"photos": ["1", "2", "3", "4", "5"]});
    assert!(serde_json::from_value::<OrderRecord>(doc).is_err());
}

#[test]
fn unicode_text_survives_canonical_comparison() {
    let mut doc = minimal_document("u1");
    doc["customer"] = json!({"name": "Zoë Ñúñez 日本", "phone": "+91 98765"});
    doc["orderDetails"]["problems"] = json!(["écran cassé", "🔋 drains fast"]);

    let record: OrderRecord = serde_json::from_value(doc).unwrap();
    let text = canonical::canonical_json(&record).unwrap();
    let back: OrderRecord = serde_json::from_str(&text).unwrap();
    assert!(canonical::is_equal(&record, &back));
}

#[test]
fn explicit_null_equals_missing() {
    let with_null = {
        let mut doc = minimal_document("n1");
        doc["customer"] = serde_json::Value::Null;
        doc["estimate"]["pickupDate"] = serde_json::Value::Null;
        serde_json::from_value::<OrderRecord>(doc).unwrap()
    };
    let without: OrderRecord = serde_json::from_value(minimal_document("n1")).unwrap();
    assert!(canonical::is_equal(&with_null, &without));
}

// ============================================================================
// Identifier Edge Cases
// ============================================================================

#[tokio::test]
async fn bad_ids_never_reach_storage() {
    let store = OrderStore::open(Arc::new(MemoryStorage::new())).await.unwrap();

    for bad in ["", "_lead", "has space", "slash/id", "x".repeat(37).as_str()] {
        let record: OrderRecord = serde_json::from_value(minimal_document(bad)).unwrap();
        let err = store.create(record).await.unwrap_err();
        assert!(err.is_validation(), "{bad:?} accepted");
    }
    assert!(store.is_empty().await);

    let longest: OrderRecord = serde_json::from_value(minimal_document(&"y".repeat(36))).unwrap();
    store.create(longest).await.unwrap();
}

// ============================================================================
// Storage Edge Cases
// ============================================================================

#[tokio::test]
async fn file_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    {
        let storage = Arc::new(FileStorage::open(dir.path()).await.unwrap());
        let store = OrderStore::open(storage).await.unwrap();
        for i in 0..5 {
            let record = serde_json::from_value(minimal_document(&format!("o{i}"))).unwrap();
            store.create(record).await.unwrap();
        }
        store.delete("o2").await.unwrap();
    }

    let storage = Arc::new(FileStorage::open(dir.path()).await.unwrap());
    let store = OrderStore::open(storage).await.unwrap();
    let ids: Vec<_> = store.all().await.into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec!["o0", "o1", "o3", "o4"]);
}

#[tokio::test]
async fn corrupt_file_reported_not_discarded() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(FileStorage::open(dir.path()).await.unwrap());
    storage.set_item("orders", "[{\"id\": ").await.unwrap();

    let err = OrderStore::open(storage.clone()).await.unwrap_err();
    assert!(matches!(err, Error::StorageCorrupt(_)));
    assert_eq!(
        storage.get_item("orders").await.unwrap().as_deref(),
        Some("[{\"id\": ")
    );
}

#[tokio::test]
async fn empty_store_reconciles_to_nothing() {
    let store = Arc::new(OrderStore::open(Arc::new(MemoryStorage::new())).await.unwrap());
    let remote = Arc::new(repairdesk_engine::MemoryRemote::new());
    let engine = SyncEngine::new(store, remote.clone());

    let report = engine.reconcile().await;
    assert_eq!(report.succeeded, 0);
    assert!(report.is_complete());
    assert_eq!(remote.total_calls().await.get, 0);
}

// ============================================================================
// Remote Edge Cases
// ============================================================================

#[tokio::test]
async fn unreachable_http_remote_fails_records_not_pass() {
    let store = Arc::new(OrderStore::open(Arc::new(MemoryStorage::new())).await.unwrap());
    let record = serde_json::from_value(minimal_document("a1")).unwrap();
    store.create(record).await.unwrap();

    // Nothing listens on port 9 (discard) in the test environment.
    let remote = Arc::new(HttpRemoteStore::new("http://127.0.0.1:9", None).unwrap());
    let engine = SyncEngine::with_options(store, remote, RetryPolicy::no_retry(), 1);

    let report = engine.reconcile().await;
    assert_eq!(report.failed, vec!["a1".to_string()]);
}

#[tokio::test]
async fn open_rejects_bad_remote_url() {
    let dir = tempfile::tempdir().unwrap();
    let config = SyncConfig {
        remote_url: "ftp://example.com".into(),
        data_dir: dir.path().to_path_buf(),
        ..SyncConfig::default()
    };
    assert!(matches!(RepairDesk::open(config).await, Err(Error::Config(_))));
}
