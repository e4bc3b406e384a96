use crate::context::TxContext;
use crate::model::Owner;
use reqledger_ledger::{
    KeyValueLedger, LedgerError, MemoryEventSink, MemoryLedger, SequenceIdSource, StepClock,
};

pub(crate) fn owner(first: &str, last: &str) -> Owner {
    Owner::new(first, last)
}

/// In-memory capabilities with a deterministic clock and key sequence.
pub(crate) struct Harness {
    pub ledger: MemoryLedger,
    pub events: MemoryEventSink,
    pub clock: StepClock,
    pub ids: SequenceIdSource,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            ledger: MemoryLedger::new(),
            events: MemoryEventSink::new(),
            clock: StepClock::new(1000, 10),
            ids: SequenceIdSource::new(),
        }
    }

    pub fn ctx(&mut self) -> TxContext<'_> {
        TxContext::new(&mut self.ledger, &mut self.events, &self.clock, &mut self.ids)
    }
}

/// Accepts a fixed number of puts, then reports the store unavailable.
pub(crate) struct FailingLedger {
    pub inner: MemoryLedger,
    puts_left: usize,
}

impl FailingLedger {
    pub fn failing_puts_after(puts: usize) -> Self {
        Self {
            inner: MemoryLedger::new(),
            puts_left: puts,
        }
    }
}

impl KeyValueLedger for FailingLedger {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        self.inner.get(key)
    }

    fn put(&mut self, key: &str, value: Vec<u8>) -> Result<(), LedgerError> {
        if self.puts_left == 0 {
            return Err(LedgerError::Unavailable(format!("put {key} refused")));
        }
        self.puts_left -= 1;
        self.inner.put(key, value)
    }
}
