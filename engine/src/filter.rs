//! Filtering of the local order list.
//!
//! Every criterion is optional and they combine with AND. Filtering never
//! reorders: the output keeps the relative order of the input.

use crate::order::{OrderRecord, OrderStatus};
use crate::{error::Result, Error};
use chrono::{Local, NaiveDate, TimeZone};
use std::collections::BTreeSet;
use std::str::FromStr;

/// Which order statuses pass the filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    Any,
    One(OrderStatus),
    AnyOf(BTreeSet<OrderStatus>),
}

impl StatusFilter {
    pub fn matches(&self, status: OrderStatus) -> bool {
        match self {
            StatusFilter::Any => true,
            StatusFilter::One(wanted) => *wanted == status,
            StatusFilter::AnyOf(set) => set.is_empty() || set.contains(&status),
        }
    }

    fn matches_all(&self) -> bool {
        match self {
            StatusFilter::Any => true,
            StatusFilter::One(_) => false,
            StatusFilter::AnyOf(set) => set.is_empty(),
        }
    }
}

impl From<OrderStatus> for StatusFilter {
    fn from(status: OrderStatus) -> Self {
        StatusFilter::One(status)
    }
}

impl FromIterator<OrderStatus> for StatusFilter {
    fn from_iter<I: IntoIterator<Item = OrderStatus>>(iter: I) -> Self {
        let set: BTreeSet<_> = iter.into_iter().collect();
        match set.len() {
            0 => StatusFilter::Any,
            1 => set
                .into_iter()
                .next()
                .map(StatusFilter::One)
                .unwrap_or_default(),
            _ => StatusFilter::AnyOf(set),
        }
    }
}

/// Parses the comma-joined multi-select form, e.g. `"Pending,Delivered"`.
impl FromStr for StatusFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(OrderStatus::from_str)
            .collect::<Result<Vec<_>>>()
            .map(|statuses| statuses.into_iter().collect())
    }
}

/// Criteria for [`filter`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    /// Exact match on `repairPartner.serviceCenterOption`.
    pub service_center: Option<String>,
    /// Exact match on `repairPartner.inHouseOption`.
    pub service_provider: Option<String>,
    /// Same calendar day as `estimate.pickupDate`.
    pub pickup_date: Option<NaiveDate>,
    /// Case-insensitive name substring or phone substring.
    pub customer_search: String,
    pub order_status: StatusFilter,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn service_center(mut self, name: impl Into<String>) -> Self {
        self.service_center = Some(name.into());
        self
    }

    pub fn service_provider(mut self, name: impl Into<String>) -> Self {
        self.service_provider = Some(name.into());
        self
    }

    pub fn pickup_date(mut self, date: NaiveDate) -> Self {
        self.pickup_date = Some(date);
        self
    }

    pub fn customer_search(mut self, needle: impl Into<String>) -> Self {
        self.customer_search = needle.into();
        self
    }

    pub fn order_status(mut self, status: impl Into<StatusFilter>) -> Self {
        self.order_status = status.into();
        self
    }

    /// Whether the filter matches every record.
    pub fn is_empty(&self) -> bool {
        non_empty(&self.service_center).is_none()
            && non_empty(&self.service_provider).is_none()
            && self.pickup_date.is_none()
            && self.customer_search.is_empty()
            && self.order_status.matches_all()
    }

    /// Whether `record` passes, with calendar days taken in `tz`.
    pub fn matches_in<Tz: TimeZone>(&self, record: &OrderRecord, tz: &Tz) -> bool {
        let partner = &record.repair_partner;

        if let Some(center) = non_empty(&self.service_center) {
            if partner.service_center_option != center {
                return false;
            }
        }
        if let Some(provider) = non_empty(&self.service_provider) {
            if partner.in_house_option != provider {
                return false;
            }
        }
        if let Some(day) = self.pickup_date {
            match record.estimate.pickup_date {
                Some(pickup) if pickup.with_timezone(tz).date_naive() == day => {}
                _ => return false,
            }
        }
        if !self.customer_search.is_empty() && !self.matches_customer(record) {
            return false;
        }
        self.order_status.matches(record.status())
    }

    fn matches_customer(&self, record: &OrderRecord) -> bool {
        let Some(customer) = &record.customer else {
            return false;
        };
        let needle = self.customer_search.to_lowercase();
        customer.name.to_lowercase().contains(&needle) || customer.phone.contains(&self.customer_search)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Records matching `spec`, calendar days in the local timezone.
pub fn filter<'a>(records: &'a [OrderRecord], spec: &FilterSpec) -> Vec<&'a OrderRecord> {
    filter_in(records, spec, &Local)
}

/// Records matching `spec`, calendar days in `tz`.
pub fn filter_in<'a, Tz: TimeZone>(
    records: &'a [OrderRecord],
    spec: &FilterSpec,
    tz: &Tz,
) -> Vec<&'a OrderRecord> {
    records.iter().filter(|r| spec.matches_in(r, tz)).collect()
}
