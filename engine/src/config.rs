//! Client-side configuration loaded from environment variables.

use crate::reconcile::RetryPolicy;
use crate::{error::Result, Error};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Remote store used when `REPAIRDESK_REMOTE_URL` is unset.
pub const DEFAULT_REMOTE_URL: &str = "http://localhost:3000";

/// Data directory used when `REPAIRDESK_DATA_DIR` is unset.
pub const DEFAULT_DATA_DIR: &str = "repairdesk-data";

/// Settings for [`RepairDesk::open`](crate::RepairDesk::open).
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Base URL of the remote document store
    pub remote_url: String,
    /// Bearer token sent to the remote store
    pub api_key: Option<String>,
    /// Directory holding the local collections
    pub data_dir: PathBuf,
    pub retry: RetryPolicy,
    /// Records reconciled at the same time
    pub concurrency: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            remote_url: DEFAULT_REMOTE_URL.to_string(),
            api_key: None,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            retry: RetryPolicy::default(),
            concurrency: 1,
        }
    }
}

impl SyncConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let remote_url = var("REPAIRDESK_REMOTE_URL").unwrap_or(defaults.remote_url);
        let api_key = var("REPAIRDESK_API_KEY");
        let data_dir = var("REPAIRDESK_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let mut retry = defaults.retry;
        if let Some(raw) = var("REPAIRDESK_RETRY_MAX_ATTEMPTS") {
            retry.max_attempts = parse("REPAIRDESK_RETRY_MAX_ATTEMPTS", &raw)?;
            if retry.max_attempts == 0 {
                return Err(Error::Config(
                    "REPAIRDESK_RETRY_MAX_ATTEMPTS must be at least 1".into(),
                ));
            }
        }
        if let Some(raw) = var("REPAIRDESK_RETRY_INITIAL_DELAY_MS") {
            retry.initial_delay =
                Duration::from_millis(parse("REPAIRDESK_RETRY_INITIAL_DELAY_MS", &raw)?);
        }

        let concurrency = match var("REPAIRDESK_SYNC_CONCURRENCY") {
            Some(raw) => parse::<usize>("REPAIRDESK_SYNC_CONCURRENCY", &raw)?.max(1),
            None => defaults.concurrency,
        };

        Ok(Self {
            remote_url,
            api_key,
            data_dir,
            retry,
            concurrency,
        })
    }
}

fn parse<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| Error::Config(format!("invalid {key} value: {raw:?}")))
}
