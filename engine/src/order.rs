//! Repair order records, the unit of synchronization.
//!
//! Every field's nullability is explicit. Optional values always serialize as
//! `null` rather than being omitted, and a missing key decodes the same way as
//! an explicit `null`, so the shape stays stable across app versions and across
//! the local/remote round trip.

use crate::{error::Result, Error, RecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of photo slots captured during device intake.
pub const PHOTO_SLOTS: usize = 4;

/// Fixed-size photo slots. An empty slot is `None`, never an empty string.
pub type Photos = [Option<String>; PHOTO_SLOTS];

/// Lifecycle state of a repair order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Repaired,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// All statuses in display order.
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Repaired,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::Repaired => "Repaired",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| Error::invalid("orderDetails.status", format!("unknown status {s:?}")))
    }
}

/// Where the repair is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RepairStation {
    InHouse,
    ServiceCenter,
}

/// Who accepted the device at the counter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Receiver {
    pub name: String,
    pub designation: String,
}

/// Customer contact details. Absent for walk-in repairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Customer {
    pub name: String,
    #[serde(alias = "number")]
    pub phone: String,
    pub address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OrderDetails {
    pub device_model: String,
    #[serde(alias = "orderStatus")]
    pub status: OrderStatus,
    pub problems: Vec<String>,
}

/// Cost estimate. Money amounts are decimal strings, compared as strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Estimate {
    #[serde(deserialize_with = "decimal_string::deserialize")]
    pub repair_cost: String,
    #[serde(deserialize_with = "decimal_string::deserialize")]
    pub advance_paid: String,
    #[serde(with = "timestamp")]
    pub pickup_date: Option<DateTime<Utc>>,
    #[serde(with = "timestamp")]
    pub pickup_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RepairPartner {
    pub station: Option<RepairStation>,
    pub in_house_option: String,
    pub service_center_option: String,
    #[serde(with = "timestamp")]
    pub pickup_date: Option<DateTime<Utc>>,
    #[serde(with = "timestamp")]
    pub pickup_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Warranty {
    pub on_warranty: bool,
    #[serde(with = "timestamp")]
    pub expiry: Option<DateTime<Utc>>,
}

/// Device intake checklist ("know your device").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeviceKyc {
    pub has_power_adapter: bool,
    pub has_keyboard: bool,
    pub has_mouse: bool,
    pub warranty: Warranty,
    #[serde(deserialize_with = "photo_slots::deserialize")]
    pub photos: Photos,
    pub other_accessories: String,
    pub additional_details: Vec<String>,
    pub lock_code: String,
}

/// A repair order as persisted locally and remotely.
///
/// `id` is assigned once by the "add order" flow and never changes; it is the
/// primary key in both stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub id: RecordId,
    #[serde(default)]
    pub receiver: Receiver,
    #[serde(default)]
    pub customer: Option<Customer>,
    #[serde(default)]
    pub order_details: OrderDetails,
    #[serde(default)]
    pub estimate: Estimate,
    #[serde(default)]
    pub repair_partner: RepairPartner,
    #[serde(default)]
    pub device_kyc: DeviceKyc,
}

impl OrderRecord {
    /// Build a record from a draft, assigning its permanent id.
    pub fn from_draft(id: impl Into<RecordId>, draft: OrderDraft) -> Self {
        Self {
            id: id.into(),
            receiver: draft.receiver,
            customer: draft.customer,
            order_details: draft.order_details,
            estimate: draft.estimate,
            repair_partner: draft.repair_partner,
            device_kyc: draft.device_kyc,
        }
    }

    pub fn status(&self) -> OrderStatus {
        self.order_details.status
    }

    /// Check the record before it is persisted anywhere.
    pub fn validate(&self) -> Result<()> {
        crate::id::validate(&self.id)?;

        require("receiver.name", &self.receiver.name)?;
        require("receiver.designation", &self.receiver.designation)?;
        require("orderDetails.deviceModel", &self.order_details.device_model)?;
        validate_amount("estimate.repairCost", &self.estimate.repair_cost)?;
        validate_amount("estimate.advancePaid", &self.estimate.advance_paid)?;

        for (slot, photo) in self.device_kyc.photos.iter().enumerate() {
            if matches!(photo, Some(reference) if reference.trim().is_empty()) {
                return Err(Error::invalid(
                    format!("deviceKyc.photos[{slot}]"),
                    "empty photo reference; leave the slot empty instead",
                ));
            }
        }

        Ok(())
    }
}

/// The contents of a new order before an id has been assigned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderDraft {
    pub receiver: Receiver,
    pub customer: Option<Customer>,
    pub order_details: OrderDetails,
    pub estimate: Estimate,
    pub repair_partner: RepairPartner,
    pub device_kyc: DeviceKyc,
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::MissingRequiredField(field.to_string()));
    }
    Ok(())
}

fn validate_amount(field: &str, value: &str) -> Result<()> {
    require(field, value)?;
    match value.trim().parse::<f64>() {
        Ok(amount) if amount.is_finite() && amount >= 0.0 => Ok(()),
        Ok(_) => Err(Error::invalid(field, "must be a non-negative amount")),
        Err(_) => Err(Error::invalid(field, format!("{value:?} is not a decimal"))),
    }
}

/// RFC 3339 timestamps with millisecond precision and a `Z` suffix.
pub(crate) mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(ts: &DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_str(&format(ts)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => DateTime::parse_from_rfc3339(raw.trim())
                .map(|ts| Some(ts.with_timezone(&Utc)))
                .map_err(|e| serde::de::Error::custom(format!("invalid timestamp {raw:?}: {e}"))),
        }
    }
}

/// Accepts a decimal as a JSON string or number and keeps it as a string.
mod decimal_string {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            Value::Null => Ok(String::new()),
            other => Err(serde::de::Error::custom(format!(
                "expected a decimal string, got {other}"
            ))),
        }
    }
}

/// Pads short or missing photo lists to exactly four slots.
mod photo_slots {
    use super::{Photos, PHOTO_SLOTS};
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Photos, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<Vec<Option<String>>>::deserialize(deserializer)?.unwrap_or_default();
        if raw.len() > PHOTO_SLOTS {
            return Err(serde::de::Error::custom(format!(
                "at most {PHOTO_SLOTS} photos are allowed, got {}",
                raw.len()
            )));
        }

        let mut photos = Photos::default();
        for (slot, photo) in photos.iter_mut().zip(raw) {
            *slot = photo.filter(|reference| !reference.is_empty());
        }
        Ok(photos)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    pub(crate) fn sample_order(id: &str) -> OrderRecord {
        OrderRecord {
            id: id.to_string(),
            receiver: Receiver {
                name: "Ravi".into(),
                designation: "Technician".into(),
            },
            customer: Some(Customer {
                name: "Alice Fernandes".into(),
                phone: "9876543210".into(),
                address: "12 Market Road".into(),
            }),
            order_details: OrderDetails {
                device_model: "ThinkPad T480".into(),
                status: OrderStatus::Pending,
                problems: vec!["No display".into(), "Loose hinge".into()],
            },
            estimate: Estimate {
                repair_cost: "2500".into(),
                advance_paid: "500".into(),
                pickup_date: Some(Utc.with_ymd_and_hms(2026, 3, 14, 10, 30, 0).unwrap()),
                pickup_time: None,
            },
            repair_partner: RepairPartner {
                station: Some(RepairStation::ServiceCenter),
                in_house_option: String::new(),
                service_center_option: "City Service Hub".into(),
                pickup_date: None,
                pickup_time: None,
            },
            device_kyc: DeviceKyc {
                has_power_adapter: true,
                warranty: Warranty {
                    on_warranty: false,
                    expiry: None,
                },
                photos: [Some("file:///photos/front.jpg".into()), None, None, None],
                lock_code: "1397".into(),
                ..DeviceKyc::default()
            },
        }
    }

    #[test]
    fn serializes_camel_case_with_explicit_nulls() {
        let mut order = sample_order("m1abc_x9");
        order.customer = None;
        let value = serde_json::to_value(&order).unwrap();

        assert_eq!(value["customer"], json!(null));
        assert_eq!(value["orderDetails"]["deviceModel"], "ThinkPad T480");
        assert_eq!(value["orderDetails"]["status"], "Pending");
        assert_eq!(value["estimate"]["pickupTime"], json!(null));
        assert_eq!(value["estimate"]["pickupDate"], "2026-03-14T10:30:00.000Z");
        assert_eq!(value["repairPartner"]["station"], "service-center");
        assert_eq!(
            value["deviceKyc"]["photos"],
            json!(["file:///photos/front.jpg", null, null, null])
        );
    }

    #[test]
    fn serialization_roundtrip() {
        let order = sample_order("m1abc_x9");
        let json = serde_json::to_string(&order).unwrap();
        let parsed: OrderRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(order, parsed);
    }

    #[test]
    fn missing_optional_keys_decode_like_null() {
        let parsed: OrderRecord = serde_json::from_value(json!({
            "id": "m1abc",
            "receiver": {"name": "Ravi", "designation": "Technician"},
            "orderDetails": {"deviceModel": "iPhone 12"},
            "estimate": {"repairCost": "100", "advancePaid": "0"}
        }))
        .unwrap();

        assert!(parsed.customer.is_none());
        assert_eq!(parsed.status(), OrderStatus::Pending);
        assert!(parsed.estimate.pickup_date.is_none());
        assert_eq!(parsed.device_kyc.photos, Photos::default());
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn accepts_legacy_field_names_and_numeric_amounts() {
        let parsed: OrderRecord = serde_json::from_value(json!({
            "id": "m1abc",
            "customer": {"name": "Bob", "number": "555-0101", "address": ""},
            "orderDetails": {"deviceModel": "Pixel 6", "orderStatus": "Delivered"},
            "estimate": {"repairCost": 1500, "advancePaid": 250.5},
            "deviceKyc": {"photos": ["a.jpg", ""]},
            "$createdAt": "2026-01-01T00:00:00.000+00:00"
        }))
        .unwrap();

        assert_eq!(parsed.customer.as_ref().unwrap().phone, "555-0101");
        assert_eq!(parsed.status(), OrderStatus::Delivered);
        assert_eq!(parsed.estimate.repair_cost, "1500");
        assert_eq!(parsed.estimate.advance_paid, "250.5");
        assert_eq!(parsed.device_kyc.photos, [Some("a.jpg".into()), None, None, None]);
    }

    #[test]
    fn rejects_unknown_status_and_extra_photos() {
        let bad_status = serde_json::from_value::<OrderRecord>(json!({
            "id": "m1abc",
            "orderDetails": {"status": "Lost"}
        }));
        assert!(bad_status.is_err());

        let too_many = serde_json::from_value::<OrderRecord>(json!({
            "id": "m1abc",
            "deviceKyc": {"photos": ["1", "2", "3", "4", "5"]}
        }));
        assert!(too_many.is_err());
    }

    #[test]
    fn timestamps_normalize_to_utc() {
        let parsed: OrderRecord = serde_json::from_value(json!({
            "id": "m1abc",
            "estimate": {"pickupDate": "2026-03-14T16:00:00+05:30"}
        }))
        .unwrap();

        assert_eq!(
            parsed.estimate.pickup_date,
            Some(Utc.with_ymd_and_hms(2026, 3, 14, 10, 30, 0).unwrap())
        );
    }

    #[test]
    fn status_parsing() {
        assert_eq!("Repaired".parse::<OrderStatus>().unwrap(), OrderStatus::Repaired);
        assert_eq!(" cancelled ".parse::<OrderStatus>().unwrap(), OrderStatus::Cancelled);
        assert!("Shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn walk_in_order_is_valid() {
        let mut order = sample_order("m1abc");
        order.customer = None;
        assert!(order.validate().is_ok());
    }

    #[test]
    fn validation_rejects_missing_fields() {
        let mut order = sample_order("m1abc");
        order.receiver.designation = "  ".into();
        assert_eq!(
            order.validate(),
            Err(Error::MissingRequiredField("receiver.designation".into()))
        );

        let mut order = sample_order("m1abc");
        order.order_details.device_model.clear();
        assert_eq!(
            order.validate(),
            Err(Error::MissingRequiredField("orderDetails.deviceModel".into()))
        );
    }

    #[test]
    fn validation_rejects_malformed_amounts() {
        let mut order = sample_order("m1abc");
        order.estimate.repair_cost = "twelve".into();
        assert!(matches!(
            order.validate(),
            Err(Error::InvalidField { ref field, .. }) if field == "estimate.repairCost"
        ));

        let mut order = sample_order("m1abc");
        order.estimate.advance_paid = "-10".into();
        assert!(order.validate().is_err());
    }

    #[test]
    fn validation_rejects_empty_photo_reference() {
        let mut order = sample_order("m1abc");
        order.device_kyc.photos[2] = Some(String::new());
        assert!(matches!(
            order.validate(),
            Err(Error::InvalidField { ref field, .. }) if field == "deviceKyc.photos[2]"
        ));
    }

    #[test]
    fn validation_rejects_bad_id() {
        let order = sample_order("_leading");
        assert!(matches!(order.validate(), Err(Error::InvalidRecordId(_))));
    }

    #[test]
    fn from_draft_keeps_contents() {
        let template = sample_order("unused");
        let draft = OrderDraft {
            receiver: template.receiver.clone(),
            customer: template.customer.clone(),
            order_details: template.order_details.clone(),
            estimate: template.estimate.clone(),
            repair_partner: template.repair_partner.clone(),
            device_kyc: template.device_kyc.clone(),
        };

        let record = OrderRecord::from_draft("fresh1", draft);
        assert_eq!(record.id, "fresh1");
        assert_eq!(record.receiver, template.receiver);
        assert_eq!(record.device_kyc, template.device_kyc);
    }
}
