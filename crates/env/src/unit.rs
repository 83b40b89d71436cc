use thiserror::Error;

use crate::memory::MemoryEnvironment;
use crate::types::{Bytes, CallOutcome, EventRecord, Identity};

/// Returned by a store attempt made inside a read-only frame.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("state mutation rejected in read-only context")]
pub struct MutationRejected;

/// Result of one unit invocation. `Err` carries the revert payload.
pub type UnitResult = Result<Bytes, Bytes>;

/// Executable logic installed at an identity.
///
/// Installed units live behind `Rc` because dispatch is reentrant: a
/// unit may call back into the unit table, including into itself.
pub trait UnitLogic {
    fn call(&self, ctx: &mut CallContext<'_>, input: &Bytes) -> UnitResult;
}

/// Per-frame view handed to unit logic.
pub struct CallContext<'a> {
    pub(crate) env: &'a mut MemoryEnvironment,
    pub(crate) identity: Identity,
    pub(crate) caller: Identity,
    pub(crate) value: u128,
    pub(crate) is_static: bool,
}

impl CallContext<'_> {
    /// Identity of the unit executing in this frame.
    pub fn identity(&self) -> Identity {
        self.identity
    }

    pub fn caller(&self) -> Identity {
        self.caller
    }

    pub fn value(&self) -> u128 {
        self.value
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn load(&self, slot: u32) -> Option<Bytes> {
        self.env.storage_get(self.identity, slot)
    }

    /// Write a storage slot of the executing unit. Rejected in a
    /// read-only frame; this rejection is the universal signal the
    /// capability probe relies on.
    pub fn store(&mut self, slot: u32, value: Bytes) -> Result<(), MutationRejected> {
        if self.is_static {
            return Err(MutationRejected);
        }
        self.env.storage_set(self.identity, slot, value);
        Ok(())
    }

    /// Emit an event with origin set to this frame's identity.
    pub fn emit(&mut self, topics: Vec<Bytes>, data: Bytes) {
        self.env.record_event(EventRecord {
            origin: self.identity,
            topics,
            data,
        });
    }

    /// Nested dispatch. Inherits the static flag of this frame.
    pub fn call(&mut self, target: Identity, value: u128, input: Bytes) -> CallOutcome {
        self.env
            .dispatch(self.identity, target, value, input, self.is_static)
    }

    /// Length of the append-only event journal.
    pub fn journal_len(&self) -> usize {
        self.env.journal_len()
    }

    /// Events appended since `start`, including events bubbled up from
    /// nested frames.
    pub fn journal_since(&self, start: usize) -> Vec<EventRecord> {
        self.env.journal_since(start)
    }
}
