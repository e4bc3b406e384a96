//! Time and identifier capabilities.
//!
//! Ledger time is rendered as Unix seconds in a decimal string, which is the
//! form stored in asset records and event payloads.

use chrono::Utc;
use std::cell::Cell;
use uuid::Uuid;

/// Source of the invocation's "now".
pub trait Clock {
    fn now(&self) -> String;
}

/// Wall clock, Unix seconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> String {
        Utc::now().timestamp().to_string()
    }
}

/// Advances by `step` seconds on every read, starting at `start`.
#[derive(Debug)]
pub struct StepClock {
    next: Cell<i64>,
    step: i64,
}

impl StepClock {
    pub fn new(start: i64, step: i64) -> Self {
        Self {
            next: Cell::new(start),
            step,
        }
    }
}

impl Clock for StepClock {
    fn now(&self) -> String {
        let current = self.next.get();
        self.next.set(current + self.step);
        current.to_string()
    }
}

/// Kinds of ledger records whose keys are generated rather than supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Content,
    DependencySet,
}

impl RecordKind {
    pub fn prefix(self) -> &'static str {
        match self {
            RecordKind::Content => "content",
            RecordKind::DependencySet => "deps",
        }
    }
}

/// Allocates fresh ledger keys for generated records.
pub trait IdSource {
    fn next_id(&mut self, kind: RecordKind) -> String;
}

/// `<prefix>-<uuid v4>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdSource;

impl IdSource for UuidIdSource {
    fn next_id(&mut self, kind: RecordKind) -> String {
        format!("{}-{}", kind.prefix(), Uuid::new_v4())
    }
}

/// Deterministic `<prefix>-<n>` keys for tests and fixtures.
#[derive(Debug, Clone, Default)]
pub struct SequenceIdSource {
    issued: u64,
}

impl SequenceIdSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdSource for SequenceIdSource {
    fn next_id(&mut self, kind: RecordKind) -> String {
        self.issued += 1;
        format!("{}-{}", kind.prefix(), self.issued)
    }
}
