//! # reqledger-ledger
//!
//! Ledger substrate for requirement assets.
//!
//! This crate provides the capabilities the core engine is handed per
//! invocation:
//! - `KeyValueLedger` (string key → opaque bytes) and the in-memory `MemoryLedger`
//! - `EventSink` (named byte payloads) with in-memory and JSONL-log sinks
//! - `Clock` and `IdSource` so timestamps and generated keys are injectable
//!
//! It intentionally knows nothing about assets. Record shapes live in
//! `reqledger-core`.
//!
//! ## Host model
//!
//! ```text
//! ledger.jsonl (on disk, one line per key)
//!     ↕  load / flush under ledger.jsonl.lock
//! MemoryLedger (one invocation's view, read-your-writes)
//! ```

pub mod atomic;
pub mod clock;
pub mod events;
pub mod jsonl;
pub mod ledger;

pub use atomic::{
    AtomicLedgerMutationError, ledger_lock_path, mutate_ledger_jsonl, mutate_ledger_jsonl_then,
};
pub use clock::{
    Clock, IdSource, RecordKind, SequenceIdSource, StepClock, SystemClock, UuidIdSource,
};
pub use events::{
    EVENT_LOG_SCHEMA, EmittedEvent, EventLogError, EventRecord, EventSink, EventSinkError,
    JsonlEventSink, MemoryEventSink, read_event_log, read_event_log_from_path,
};
pub use jsonl::{
    JsonlError, LedgerEntry, read_entries, read_entries_from_path, write_entries,
    write_entries_to_path,
};
pub use ledger::{
    KeyValueLedger, LEDGER_SNAPSHOT_REF_PREFIX, LedgerError, MemoryLedger, ReadOnlyLedger,
};
