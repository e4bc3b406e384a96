//! Key-value ledger capability and its in-memory implementation.

use crate::jsonl::{JsonlError, LedgerEntry, read_entries_from_path, write_entries_to_path};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;

pub const LEDGER_SNAPSHOT_REF_PREFIX: &str = "ls1_";

/// A durable map from string key to opaque bytes, scoped to one invocation.
///
/// The ledger does not distinguish "missing" from "failed": an absent key is
/// `Ok(None)`, every failure is one generic [`LedgerError`].
pub trait KeyValueLedger {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError>;
    fn put(&mut self, key: &str, value: Vec<u8>) -> Result<(), LedgerError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// In-memory ledger state for one invocation.
///
/// Tracks the keys written since load so hosts can decide whether a flush
/// is needed.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    records: BTreeMap<String, Vec<u8>>,
    writes: usize,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ledger from stored entries.
    ///
    /// Duplicate keys resolve last-write-wins, matching append/overwrite
    /// semantics of the file substrate.
    pub fn from_entries(entries: Vec<LedgerEntry>) -> Self {
        let mut records = BTreeMap::new();
        for entry in entries {
            records.insert(entry.key, entry.value.into_bytes());
        }
        Self { records, writes: 0 }
    }

    /// Load ledger state from a JSONL file. A missing file is an empty ledger.
    pub fn load_jsonl(path: impl AsRef<Path>) -> Result<Self, JsonlError> {
        let entries = read_entries_from_path(path)?;
        Ok(Self::from_entries(entries))
    }

    /// Persist ledger state to a JSONL file.
    pub fn save_jsonl(&self, path: impl AsRef<Path>) -> Result<(), JsonlError> {
        let entries = self.entries()?;
        write_entries_to_path(path, &entries)
    }

    /// Stored entries in key order. Values must be UTF-8 to be representable.
    pub fn entries(&self) -> Result<Vec<LedgerEntry>, JsonlError> {
        self.records
            .iter()
            .map(|(key, value)| {
                let value = String::from_utf8(value.clone()).map_err(|_| {
                    JsonlError::Serialize(format!("value for key {key} is not UTF-8"))
                })?;
                Ok(LedgerEntry {
                    key: key.clone(),
                    value,
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    /// Number of puts since load.
    pub fn write_count(&self) -> usize {
        self.writes
    }

    /// Whether any put happened since load.
    pub fn is_dirty(&self) -> bool {
        self.writes > 0
    }

    /// Content-addressed reference for the current ledger state.
    pub fn snapshot_ref(&self) -> String {
        let mut hasher = Sha256::new();
        for (key, value) in &self.records {
            hasher.update(key.as_bytes());
            hasher.update([0u8]);
            hasher.update(value);
            hasher.update([b'\n']);
        }
        let digest = hasher.finalize();
        let hex: String = digest.iter().map(|byte| format!("{byte:02x}")).collect();
        format!("{LEDGER_SNAPSHOT_REF_PREFIX}{hex}")
    }
}

impl KeyValueLedger for MemoryLedger {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        Ok(self.records.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: Vec<u8>) -> Result<(), LedgerError> {
        self.records.insert(key.to_string(), value);
        self.writes += 1;
        Ok(())
    }
}

/// Read-only view used for evaluate-only invocations. Every put fails.
#[derive(Debug)]
pub struct ReadOnlyLedger<'a> {
    inner: &'a MemoryLedger,
}

impl<'a> ReadOnlyLedger<'a> {
    pub fn new(inner: &'a MemoryLedger) -> Self {
        Self { inner }
    }
}

impl KeyValueLedger for ReadOnlyLedger<'_> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        self.inner.get(key)
    }

    fn put(&mut self, key: &str, _value: Vec<u8>) -> Result<(), LedgerError> {
        Err(LedgerError::Unavailable(format!(
            "ledger opened read-only; refused write to {key}"
        )))
    }
}
