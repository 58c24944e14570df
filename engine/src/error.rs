//! Error types for the RepairDesk engine.

use crate::RecordId;
use thiserror::Error;

/// All possible errors from the RepairDesk engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Validation errors
    #[error("missing required field: {0}")]
    MissingRequiredField(String),

    #[error("invalid value for field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    #[error("invalid record id: {0:?}")]
    InvalidRecordId(String),

    #[error("record already exists: {0}")]
    DuplicateRecord(RecordId),

    #[error("record id mismatch: expected {expected}, got {actual}")]
    RecordIdMismatch { expected: RecordId, actual: RecordId },

    // Local storage errors
    #[error("storage write failed: {0}")]
    StorageWrite(String),

    #[error("stored data is corrupt: {0}")]
    StorageCorrupt(String),

    // Remote errors
    #[error("network error: {0}")]
    Network(String),

    #[error("record not found: {0}")]
    NotFound(RecordId),

    #[error("record already exists remotely: {0}")]
    Conflict(RecordId),

    // Sync errors
    #[error("sync gave up after {attempts} attempts; {} record(s) still failing", failed.len())]
    RetryExhausted { attempts: u32, failed: Vec<RecordId> },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error was raised before anything reached storage.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::MissingRequiredField(_)
                | Error::InvalidField { .. }
                | Error::InvalidRecordId(_)
                | Error::DuplicateRecord(_)
                | Error::RecordIdMismatch { .. }
        )
    }

    /// Whether the failure is a transport problem worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Network(_))
    }

    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
