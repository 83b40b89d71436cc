use std::rc::Rc;

use crucible_env::{
    Bytes, CallContext, CallOutcome, Environment, Identity, UnitLogic, UnitResult,
};

use crate::error::HarnessError;

/// Seed for the helper unit's deterministic identity.
const PROBE_SEED: &str = "crucible.probe.helper";

const PROBE_SLOT: u32 = 0;
const PROBE_VALUE: u8 = 1;

/// Helper logic: one idempotent storage write. In a read-only frame the
/// write is rejected and the call fails, which is the whole signal.
struct ProbeHelper;

impl UnitLogic for ProbeHelper {
    fn call(&self, ctx: &mut CallContext<'_>, _input: &Bytes) -> UnitResult {
        ctx.store(PROBE_SLOT, Bytes::from(&[PROBE_VALUE][..]))
            .map_err(|e| Bytes::from(e.to_string().into_bytes()))?;
        Ok(Bytes::new())
    }
}

/// Classifies the current execution context as mutation-capable or
/// read-only by attempting a benign state write through a helper unit.
pub struct CapabilityProbe {
    helper: Identity,
}

impl CapabilityProbe {
    /// Install the helper unit. The identity is seed-derived, so calling
    /// this repeatedly in the same environment is an overwrite-safe
    /// no-op.
    pub fn initialize<E: Environment>(env: &mut E) -> Self {
        let helper = Identity::from_seed(PROBE_SEED);
        env.install_unit(helper, Rc::new(ProbeHelper));
        CapabilityProbe { helper }
    }

    /// Attach to an already-initialized probe without reinstalling.
    /// [`probe`](Self::probe) still fails fast if the helper was never
    /// actually installed.
    pub fn attached() -> Self {
        CapabilityProbe {
            helper: Identity::from_seed(PROBE_SEED),
        }
    }

    pub fn helper_identity(&self) -> Identity {
        self.helper
    }

    /// True iff the surrounding context rejects state mutation. The only
    /// side effect on a mutable context is the helper's own slot being
    /// reset to a fixed value; caller state is never touched.
    pub fn probe<E: Environment>(&self, env: &mut E) -> Result<bool, HarnessError> {
        if !env.has_unit(self.helper) {
            return Err(HarnessError::ProbeUninitialized);
        }
        let outcome = env.call(self.helper, 0, Bytes::new());
        Ok(Self::classify(&outcome))
    }

    /// Pure classification of the mutate-attempt outcome: a rejected
    /// attempt means the context is read-only.
    pub fn classify(outcome: &CallOutcome) -> bool {
        !outcome.success
    }
}
