//! Error taxonomy for asset operations.

use reqledger_ledger::LedgerError;

/// Every failure an asset operation can surface. None are recovered locally.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    /// Creation collided with an existing ledger key.
    #[error("asset with id {0} already exists")]
    AlreadyExists(String),

    /// A referenced record is absent.
    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    /// The ledger call itself failed.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] LedgerError),

    /// Stored bytes did not decode as the expected record.
    #[error("data stored at {key} is not a valid {kind}: {message}")]
    CorruptRecord {
        kind: &'static str,
        key: String,
        message: String,
    },

    /// Notification failed after the ledger writes were made.
    #[error("event {event} not delivered: {message}")]
    EventDeliveryFailed { event: String, message: String },
}

impl LifecycleError {
    pub(crate) fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            key: key.into(),
        }
    }

    /// Stable snake_case class used in transport envelopes.
    pub fn failure_class(&self) -> &'static str {
        match self {
            Self::AlreadyExists(_) => "already_exists",
            Self::NotFound { .. } => "not_found",
            Self::StorageUnavailable(_) => "storage_unavailable",
            Self::CorruptRecord { .. } => "corrupt_record",
            Self::EventDeliveryFailed { .. } => "event_delivery_failed",
        }
    }
}
