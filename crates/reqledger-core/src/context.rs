//! Per-invocation capability bundle.

use crate::error::LifecycleError;
use crate::payload::EventPayload;
use reqledger_ledger::{Clock, EventSink, IdSource, KeyValueLedger, RecordKind};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Everything one invocation may touch: the ledger, the event sink, the
/// clock and the key allocator. Handed to each operation; never global.
pub struct TxContext<'a> {
    ledger: &'a mut dyn KeyValueLedger,
    events: &'a mut dyn EventSink,
    clock: &'a dyn Clock,
    ids: &'a mut dyn IdSource,
}

impl<'a> TxContext<'a> {
    pub fn new(
        ledger: &'a mut dyn KeyValueLedger,
        events: &'a mut dyn EventSink,
        clock: &'a dyn Clock,
        ids: &'a mut dyn IdSource,
    ) -> Self {
        Self {
            ledger,
            events,
            clock,
            ids,
        }
    }

    pub fn now(&self) -> String {
        self.clock.now()
    }

    pub(crate) fn next_id(&mut self, kind: RecordKind) -> String {
        self.ids.next_id(kind)
    }

    pub(crate) fn exists(&self, key: &str) -> Result<bool, LifecycleError> {
        Ok(self.ledger.get(key)?.is_some())
    }

    /// Load and decode a record. Absent → `NotFound`, undecodable → `CorruptRecord`.
    pub(crate) fn read_record<T: DeserializeOwned>(
        &self,
        kind: &'static str,
        key: &str,
    ) -> Result<T, LifecycleError> {
        let bytes = self
            .ledger
            .get(key)?
            .ok_or_else(|| LifecycleError::not_found(kind, key))?;
        serde_json::from_slice(&bytes).map_err(|e| LifecycleError::CorruptRecord {
            kind,
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    pub(crate) fn write_record<T: Serialize>(
        &mut self,
        kind: &'static str,
        key: &str,
        record: &T,
    ) -> Result<(), LifecycleError> {
        let bytes = serde_json::to_vec(record).map_err(|e| LifecycleError::CorruptRecord {
            kind,
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.ledger.put(key, bytes)?;
        Ok(())
    }

    /// Hand a payload to the sink under its fixed name. Last step of an operation.
    pub(crate) fn emit<P: EventPayload>(&mut self, payload: &P) -> Result<(), LifecycleError> {
        let name = P::NAME.as_str();
        let bytes =
            serde_json::to_vec(payload).map_err(|e| LifecycleError::EventDeliveryFailed {
                event: name.to_string(),
                message: e.to_string(),
            })?;
        self.events.emit(name, bytes).map_err(|e| {
            tracing::warn!(event = name, error = %e, "event delivery failed after commit");
            LifecycleError::EventDeliveryFailed {
                event: name.to_string(),
                message: e.to_string(),
            }
        })
    }
}
