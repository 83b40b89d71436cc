use std::rc::Rc;

use crate::expectation::{EmitFilter, RevertExpectation};
use crate::types::{Bytes, CallOutcome, EventRecord, Identity, SnapshotId};
use crate::unit::UnitLogic;

/// The privileged environment surface the instrumentation core drives.
///
/// Passed explicitly into every operation, so the one environment under
/// test is an injected dependency rather than an ambient global. The
/// environment is trusted: argument marshalling only, no validation of
/// value domains here or in callers.
pub trait Environment {
    // Block parameter mutators. Delegated verbatim.
    fn set_timestamp(&mut self, timestamp: u64);
    fn set_block_number(&mut self, number: u64);
    fn set_base_fee(&mut self, fee: u128);
    fn set_difficulty(&mut self, difficulty: u128);
    fn set_chain_id(&mut self, chain_id: u64);
    fn set_coinbase(&mut self, coinbase: Identity);

    fn timestamp(&self) -> u64;
    fn block_number(&self) -> u64;
    fn base_fee(&self) -> u128;
    fn difficulty(&self) -> u128;
    fn chain_id(&self) -> u64;
    fn coinbase(&self) -> Identity;

    // One-shot expectations. Armed here, resolved by the environment.
    fn expect_revert(&mut self, expectation: RevertExpectation);
    fn expect_emit(&mut self, filter: EmitFilter);
    fn expect_call(&mut self, target: Identity, value: Option<u128>, data: Bytes);

    // Call mocking. Entries persist until cleared en masse.
    fn mock_call(&mut self, target: Identity, value: Option<u128>, data: Bytes, ret: Bytes);
    fn clear_mocked_calls(&mut self);

    // Log capture. `recorded_logs` drains everything recorded since the
    // previous drain (or since recording started).
    fn start_log_recording(&mut self);
    fn recorded_logs(&mut self) -> Vec<EventRecord>;

    // Snapshot management.
    fn snapshot(&mut self) -> SnapshotId;
    fn revert_to_snapshot(&mut self, id: SnapshotId) -> bool;

    /// Deploy executable logic at a fixed identity. Installing at an
    /// occupied identity overwrites it.
    fn install_unit(&mut self, identity: Identity, logic: Rc<dyn UnitLogic>);
    fn has_unit(&self, identity: Identity) -> bool;

    /// Dispatch a call to an installed unit.
    fn call(&mut self, target: Identity, value: u128, input: Bytes) -> CallOutcome;

    /// Dispatch with state mutation rejected for the whole nested call
    /// tree.
    fn static_call(&mut self, target: Identity, value: u128, input: Bytes) -> CallOutcome;
}
