use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::EnvError;
use crate::expectation::{CallExpectation, EmitExpectation, EmitFilter, RevertExpectation};
use crate::gateway::Environment;
use crate::types::{Bytes, CallOutcome, EventRecord, Identity, MockKey, SnapshotId};
use crate::unit::{CallContext, UnitLogic};

/// Revert payload for a call dispatched to an identity with no unit
/// installed.
pub const MISSING_UNIT_PAYLOAD: &[u8] = b"no unit installed at target";

/// Mutable block-level execution parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockParams {
    pub timestamp: u64,
    pub number: u64,
    pub base_fee: u128,
    pub difficulty: u128,
    pub chain_id: u64,
    pub coinbase: Identity,
}

type UnitStorage = BTreeMap<u32, Bytes>;

#[derive(Debug, Clone)]
struct Snapshot {
    params: BlockParams,
    storage: HashMap<Identity, UnitStorage>,
}

/// In-memory reference environment.
///
/// Single logical thread of control: one call runs to completion before
/// the next begins, so nothing in here needs locking. Nested dispatch
/// re-enters through the ordinary call stack.
///
/// Expectation re-arming is environment-defined: the revert expectation
/// is a single slot (re-arming replaces it); emit and call expectations
/// accumulate until resolved.
pub struct MemoryEnvironment {
    params: BlockParams,
    units: HashMap<Identity, Rc<dyn UnitLogic>>,
    storage: HashMap<Identity, UnitStorage>,
    mocks: HashMap<MockKey, Bytes>,
    revert_expectation: Option<RevertExpectation>,
    emit_expectations: Vec<EmitExpectation>,
    call_expectations: Vec<CallExpectation>,
    journal: Vec<EventRecord>,
    recording_from: Option<usize>,
    snapshots: HashMap<SnapshotId, Snapshot>,
    next_snapshot: u64,
    driver: Identity,
    depth: usize,
    forced_static: bool,
    violations: Vec<String>,
}

impl Default for MemoryEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEnvironment {
    pub fn new() -> Self {
        MemoryEnvironment {
            params: BlockParams::default(),
            units: HashMap::new(),
            storage: HashMap::new(),
            mocks: HashMap::new(),
            revert_expectation: None,
            emit_expectations: Vec::new(),
            call_expectations: Vec::new(),
            journal: Vec::new(),
            recording_from: None,
            snapshots: HashMap::new(),
            next_snapshot: 0,
            driver: Identity::from_seed("crucible.test-driver"),
            depth: 0,
            forced_static: false,
            violations: Vec::new(),
        }
    }

    /// Identity attributed to top-level calls made by test code.
    pub fn driver(&self) -> Identity {
        self.driver
    }

    pub fn block_params(&self) -> &BlockParams {
        &self.params
    }

    /// Run `f` with every dispatch forced read-only, modeling code that
    /// executes inside a static context.
    pub fn static_scope<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let previous = self.forced_static;
        self.forced_static = true;
        let out = f(self);
        self.forced_static = previous;
        out
    }

    /// Raw storage read, bypassing any frame.
    pub fn storage_get(&self, identity: Identity, slot: u32) -> Option<Bytes> {
        self.storage
            .get(&identity)
            .and_then(|slots| slots.get(&slot))
            .cloned()
    }

    pub(crate) fn storage_set(&mut self, identity: Identity, slot: u32, value: Bytes) {
        self.storage.entry(identity).or_default().insert(slot, value);
    }

    pub(crate) fn record_event(&mut self, event: EventRecord) {
        for expectation in &mut self.emit_expectations {
            expectation.observe(&event);
        }
        self.journal.push(event);
    }

    pub(crate) fn journal_len(&self) -> usize {
        self.journal.len()
    }

    pub(crate) fn journal_since(&self, start: usize) -> Vec<EventRecord> {
        self.journal.get(start..).unwrap_or_default().to_vec()
    }

    /// Violations recorded so far (expected reverts that did not happen,
    /// mismatched payloads).
    pub fn violations(&self) -> &[String] {
        &self.violations
    }

    /// End-of-test check: every armed expectation must have resolved and
    /// no violation may have been recorded.
    pub fn finish(&mut self) -> Result<(), EnvError> {
        if let Some(violation) = self.violations.first() {
            return Err(EnvError::ExpectationViolated(violation.clone()));
        }
        if self.revert_expectation.is_some() {
            return Err(EnvError::UnmetExpectation(
                "revert expectation never consumed".into(),
            ));
        }
        if self
            .emit_expectations
            .iter()
            .any(|expectation| !expectation.satisfied)
        {
            return Err(EnvError::UnmetExpectation(
                "expected event never emitted".into(),
            ));
        }
        if let Some(expectation) = self
            .call_expectations
            .iter()
            .find(|expectation| !expectation.satisfied)
        {
            return Err(EnvError::UnmetExpectation(format!(
                "expected call to {} never occurred",
                expectation.target
            )));
        }
        Ok(())
    }

    fn mock_lookup(&self, target: Identity, value: u128, data: &Bytes) -> Option<Bytes> {
        let exact = MockKey {
            target,
            value: Some(value),
            data: data.clone(),
        };
        if let Some(ret) = self.mocks.get(&exact) {
            return Some(ret.clone());
        }
        let any_value = MockKey {
            target,
            value: None,
            data: data.clone(),
        };
        self.mocks.get(&any_value).cloned()
    }

    pub(crate) fn dispatch(
        &mut self,
        caller: Identity,
        target: Identity,
        value: u128,
        input: Bytes,
        is_static: bool,
    ) -> CallOutcome {
        self.depth += 1;
        let outcome = self.dispatch_frame(caller, target, value, input, is_static);
        self.depth -= 1;

        // Revert expectations apply to the next top-level call only.
        if self.depth == 0 {
            if let Some(expectation) = self.revert_expectation.take() {
                return self.resolve_revert_expectation(expectation, outcome);
            }
        }
        outcome
    }

    fn dispatch_frame(
        &mut self,
        caller: Identity,
        target: Identity,
        value: u128,
        input: Bytes,
        is_static: bool,
    ) -> CallOutcome {
        // Call expectations see every dispatch, mocked or real.
        for expectation in &mut self.call_expectations {
            if !expectation.satisfied && expectation.matches(target, value, &input) {
                expectation.satisfied = true;
            }
        }

        if let Some(ret) = self.mock_lookup(target, value, &input) {
            return CallOutcome::ok(ret);
        }

        let Some(unit) = self.units.get(&target).cloned() else {
            return CallOutcome::reverted(Bytes::from(MISSING_UNIT_PAYLOAD));
        };

        // A frame that fails outward rolls its storage writes back.
        let checkpoint = self.storage.clone();
        let is_static = is_static || self.forced_static;
        let mut ctx = CallContext {
            env: self,
            identity: target,
            caller,
            value,
            is_static,
        };
        match unit.call(&mut ctx, &input) {
            Ok(output) => CallOutcome::ok(output),
            Err(payload) => {
                self.storage = checkpoint;
                CallOutcome::reverted(payload)
            }
        }
    }

    fn resolve_revert_expectation(
        &mut self,
        expectation: RevertExpectation,
        outcome: CallOutcome,
    ) -> CallOutcome {
        if outcome.success {
            self.violations
                .push("expected revert, but the call succeeded".into());
            return outcome;
        }
        if expectation.matches(&outcome.output) {
            CallOutcome::ok(Bytes::new())
        } else {
            self.violations.push(format!(
                "revert payload mismatch: got {:?}",
                outcome.output
            ));
            outcome
        }
    }
}

impl Environment for MemoryEnvironment {
    fn set_timestamp(&mut self, timestamp: u64) {
        self.params.timestamp = timestamp;
    }

    fn set_block_number(&mut self, number: u64) {
        self.params.number = number;
    }

    fn set_base_fee(&mut self, fee: u128) {
        self.params.base_fee = fee;
    }

    fn set_difficulty(&mut self, difficulty: u128) {
        self.params.difficulty = difficulty;
    }

    fn set_chain_id(&mut self, chain_id: u64) {
        self.params.chain_id = chain_id;
    }

    fn set_coinbase(&mut self, coinbase: Identity) {
        self.params.coinbase = coinbase;
    }

    fn timestamp(&self) -> u64 {
        self.params.timestamp
    }

    fn block_number(&self) -> u64 {
        self.params.number
    }

    fn base_fee(&self) -> u128 {
        self.params.base_fee
    }

    fn difficulty(&self) -> u128 {
        self.params.difficulty
    }

    fn chain_id(&self) -> u64 {
        self.params.chain_id
    }

    fn coinbase(&self) -> Identity {
        self.params.coinbase
    }

    fn expect_revert(&mut self, expectation: RevertExpectation) {
        self.revert_expectation = Some(expectation);
    }

    fn expect_emit(&mut self, filter: EmitFilter) {
        self.emit_expectations.push(EmitExpectation::new(filter));
    }

    fn expect_call(&mut self, target: Identity, value: Option<u128>, data: Bytes) {
        self.call_expectations
            .push(CallExpectation::new(target, value, data));
    }

    fn mock_call(&mut self, target: Identity, value: Option<u128>, data: Bytes, ret: Bytes) {
        self.mocks.insert(
            MockKey {
                target,
                value,
                data,
            },
            ret,
        );
    }

    fn clear_mocked_calls(&mut self) {
        self.mocks.clear();
    }

    fn start_log_recording(&mut self) {
        self.recording_from = Some(self.journal.len());
    }

    fn recorded_logs(&mut self) -> Vec<EventRecord> {
        match self.recording_from {
            Some(from) => {
                let logs = self.journal_since(from);
                self.recording_from = Some(self.journal.len());
                logs
            }
            None => Vec::new(),
        }
    }

    fn snapshot(&mut self) -> SnapshotId {
        let id = SnapshotId(self.next_snapshot);
        self.next_snapshot += 1;
        self.snapshots.insert(
            id,
            Snapshot {
                params: self.params.clone(),
                storage: self.storage.clone(),
            },
        );
        id
    }

    fn revert_to_snapshot(&mut self, id: SnapshotId) -> bool {
        // A successful rollback consumes the identifier.
        match self.snapshots.remove(&id) {
            Some(snapshot) => {
                self.params = snapshot.params;
                self.storage = snapshot.storage;
                true
            }
            None => false,
        }
    }

    fn install_unit(&mut self, identity: Identity, logic: Rc<dyn UnitLogic>) {
        self.units.insert(identity, logic);
    }

    fn has_unit(&self, identity: Identity) -> bool {
        self.units.contains_key(&identity)
    }

    fn call(&mut self, target: Identity, value: u128, input: Bytes) -> CallOutcome {
        let caller = self.driver;
        self.dispatch(caller, target, value, input, false)
    }

    fn static_call(&mut self, target: Identity, value: u128, input: Bytes) -> CallOutcome {
        let caller = self.driver;
        self.dispatch(caller, target, value, input, true)
    }
}
