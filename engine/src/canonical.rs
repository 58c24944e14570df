//! Change detection between two copies of the same record.
//!
//! Two copies are equal when their canonical forms are equal. The canonical
//! form is the record's typed serialization:
//! - object keys are sorted,
//! - every optional field is present as `null` when absent,
//! - money amounts stay strings,
//! - timestamps are UTC with millisecond precision.
//!
//! Attributes a store adds on its own (system ids, audit timestamps) are not
//! part of `OrderRecord` and therefore never count as a difference.

use crate::{error::Result, Error, OrderRecord};
use serde_json::Value;

/// Canonical JSON value of a record.
pub fn canonical_value(record: &OrderRecord) -> Result<Value> {
    serde_json::to_value(record)
        .map(sort_keys)
        .map_err(|e| Error::invalid("record", e.to_string()))
}

/// Rebuild every object with its keys in lexicographic order.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, sort_keys(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Canonical JSON text of a record. Stable across runs and platforms.
pub fn canonical_json(record: &OrderRecord) -> Result<String> {
    let value = canonical_value(record)?;
    serde_json::to_string(&value).map_err(|e| Error::invalid("record", e.to_string()))
}

/// Whether two copies of a record are semantically identical.
///
/// Any difference in the canonical form counts as a modification; there is
/// no field-level merge.
pub fn is_equal(a: &OrderRecord, b: &OrderRecord) -> bool {
    match (canonical_value(a), canonical_value(b)) {
        (Ok(left), Ok(right)) => left == right,
        // Unserializable records can't be shown identical; treat as modified.
        _ => false,
    }
}

/// Decode a document received from a store into its canonical record form.
pub fn from_document(document: Value) -> Result<OrderRecord> {
    serde_json::from_value(document).map_err(|e| Error::StorageCorrupt(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::tests::sample_order;
    use crate::OrderStatus;
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn identical_records_are_equal() {
        let a = sample_order("m1abc");
        let b = a.clone();
        assert!(is_equal(&a, &b));
    }

    #[test]
    fn single_field_change_is_detected() {
        let a = sample_order("m1abc");
        let mut b = a.clone();
        b.order_details.status = OrderStatus::Delivered;
        assert!(!is_equal(&a, &b));

        let mut c = a.clone();
        c.order_details.problems.reverse();
        assert!(!is_equal(&a, &c));
    }

    #[test]
    fn key_order_and_system_fields_are_ignored() {
        let local = sample_order("m1abc");
        let mut document = serde_json::to_value(&local).unwrap();
        let object = document.as_object_mut().unwrap();
        object.insert("$id".into(), json!("m1abc"));
        object.insert("$updatedAt".into(), json!("2026-05-01T00:00:00.000+00:00"));

        // Rebuild with keys in reverse order.
        let reversed: serde_json::Map<_, _> = object
            .iter()
            .rev()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let remote = from_document(Value::Object(reversed)).unwrap();
        assert!(is_equal(&local, &remote));
    }

    #[test]
    fn undefined_and_null_compare_equal() {
        let mut local = sample_order("m1abc");
        local.customer = None;
        local.estimate.pickup_date = None;

        let mut document = serde_json::to_value(&local).unwrap();
        let object = document.as_object_mut().unwrap();
        object.remove("customer");
        object["estimate"].as_object_mut().unwrap().remove("pickupDate");

        let remote = from_document(document).unwrap();
        assert!(is_equal(&local, &remote));
    }

    #[test]
    fn amounts_compare_as_strings() {
        let local = sample_order("m1abc");
        let mut document = serde_json::to_value(&local).unwrap();
        document["estimate"]["repairCost"] = json!(2500);
        let remote = from_document(document).unwrap();
        assert!(is_equal(&local, &remote));

        // "2500.00" is a different string from "2500".
        let mut padded = local.clone();
        padded.estimate.repair_cost = "2500.00".into();
        assert!(!is_equal(&local, &padded));
    }

    #[test]
    fn sub_millisecond_drift_is_normalized() {
        let mut local = sample_order("m1abc");
        let base = Utc.with_ymd_and_hms(2026, 3, 14, 10, 30, 0).unwrap();
        local.estimate.pickup_date = Some(base + Duration::microseconds(250));

        let mut remote = local.clone();
        remote.estimate.pickup_date = Some(base);

        assert!(is_equal(&local, &remote));
    }

    #[test]
    fn canonical_json_is_stable() {
        let record = sample_order("m1abc");
        let first = canonical_json(&record).unwrap();
        let second = canonical_json(&record.clone()).unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with(r#"{"customer":"#));
    }

    #[test]
    fn from_document_reports_corruption() {
        let err = from_document(json!({"receiver": "nobody"})).unwrap_err();
        assert!(matches!(err, Error::StorageCorrupt(_)));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_roundtrip_is_equal(
                name in "[A-Za-z ]{0,20}",
                phone in "[0-9]{0,12}",
                cost in 0u32..100_000,
                problems in proptest::collection::vec("[a-z ]{1,15}", 0..5),
                offset_secs in 0i64..86_400 * 365,
            ) {
                let mut record = sample_order("m1abc");
                record.customer = if name.is_empty() {
                    None
                } else {
                    Some(crate::Customer { name, phone, address: String::new() })
                };
                record.estimate.repair_cost = cost.to_string();
                record.order_details.problems = problems;
                record.repair_partner.pickup_date =
                    Some(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(offset_secs));

                let persisted = serde_json::to_string(&record).unwrap();
                let restored: OrderRecord = serde_json::from_str(&persisted).unwrap();
                prop_assert!(is_equal(&record, &restored));
            }
        }
    }
}
