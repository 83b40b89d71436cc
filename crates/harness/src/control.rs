use crucible_env::{
    Bytes, EmitFilter, Environment, Identity, RevertExpectation, Selector, SnapshotId,
};

use crate::error::HarnessError;
use crate::probe::CapabilityProbe;

/// Fluent façade over the injected environment — the surface test code
/// drives to arrange parameters, expectations, mocks and snapshots.
///
/// Every mutator is a validated pass-through that returns `&mut Self`,
/// so arrangements chain; the handle itself carries no state. Value
/// domains are the environment's concern, not checked here.
pub struct Controller<'e, E: Environment> {
    env: &'e mut E,
    probe: Option<CapabilityProbe>,
}

impl<'e, E: Environment> Controller<'e, E> {
    pub fn new(env: &'e mut E) -> Self {
        Controller { env, probe: None }
    }

    /// Direct access to the underlying environment, for exercising logic
    /// after arrangement.
    pub fn env(&mut self) -> &mut E {
        self.env
    }

    // Parameter mutators.

    pub fn timestamp(&mut self, timestamp: u64) -> &mut Self {
        self.env.set_timestamp(timestamp);
        self
    }

    pub fn block_number(&mut self, number: u64) -> &mut Self {
        self.env.set_block_number(number);
        self
    }

    pub fn base_fee(&mut self, fee: u128) -> &mut Self {
        self.env.set_base_fee(fee);
        self
    }

    pub fn difficulty(&mut self, difficulty: u128) -> &mut Self {
        self.env.set_difficulty(difficulty);
        self
    }

    pub fn chain_id(&mut self, chain_id: u64) -> &mut Self {
        self.env.set_chain_id(chain_id);
        self
    }

    pub fn coinbase(&mut self, coinbase: Identity) -> &mut Self {
        self.env.set_coinbase(coinbase);
        self
    }

    // Revert expectations.

    /// Expect any failure on the next call.
    pub fn expect_revert(&mut self) -> &mut Self {
        self.env.expect_revert(RevertExpectation::Any);
        self
    }

    /// Expect a failure carrying exactly this payload.
    pub fn expect_revert_payload(&mut self, payload: Bytes) -> &mut Self {
        self.env.expect_revert(RevertExpectation::Payload(payload));
        self
    }

    /// Expect a failure whose payload starts with this selector.
    pub fn expect_revert_selector(&mut self, selector: Selector) -> &mut Self {
        self.env.expect_revert(RevertExpectation::Selector(selector));
        self
    }

    // Event expectation.

    pub fn expect_emit(&mut self, filter: EmitFilter) -> &mut Self {
        self.env.expect_emit(filter);
        self
    }

    // Call mocking.

    /// Calls to `target` with exactly `data` (any value amount) return
    /// `ret` instead of executing the real logic.
    pub fn mock_call(&mut self, target: Identity, data: Bytes, ret: Bytes) -> &mut Self {
        self.env.mock_call(target, None, data, ret);
        self
    }

    /// As [`mock_call`](Self::mock_call), additionally keyed on the
    /// value amount.
    pub fn mock_call_with_value(
        &mut self,
        target: Identity,
        value: u128,
        data: Bytes,
        ret: Bytes,
    ) -> &mut Self {
        self.env.mock_call(target, Some(value), data, ret);
        self
    }

    pub fn clear_mocked_calls(&mut self) -> &mut Self {
        self.env.clear_mocked_calls();
        self
    }

    // Call-occurrence expectation.

    pub fn expect_call(&mut self, target: Identity, data: Bytes) -> &mut Self {
        self.env.expect_call(target, None, data);
        self
    }

    pub fn expect_call_with_value(
        &mut self,
        target: Identity,
        value: u128,
        data: Bytes,
    ) -> &mut Self {
        self.env.expect_call(target, Some(value), data);
        self
    }

    // Snapshot management. These return values rather than the handle.

    pub fn snapshot(&mut self) -> SnapshotId {
        self.env.snapshot()
    }

    pub fn revert_to_snapshot(&mut self, id: SnapshotId) -> bool {
        self.env.revert_to_snapshot(id)
    }

    // Capability probe.

    pub fn init_probe(&mut self) -> &mut Self {
        self.probe = Some(CapabilityProbe::initialize(self.env));
        self
    }

    /// True iff the current context rejects state mutation. Errors if
    /// the probe was never initialized.
    pub fn is_static(&mut self) -> Result<bool, HarnessError> {
        let probe = self.probe.as_ref().ok_or(HarnessError::ProbeUninitialized)?;
        probe.probe(self.env)
    }
}
