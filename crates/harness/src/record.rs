use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crucible_env::{
    Bytes, CallContext, Environment, EventRecord, Identity, UnitLogic, UnitResult,
};

use crate::error::HarnessError;

/// Current version of the exported trace format.
pub const TRACE_VERSION: u32 = 1;

const MAX_SUPPORTED_VERSION: u32 = 1;

/// One intercepted call: input, outcome, output, and the events the
/// recorded unit itself produced during the call. Immutable once
/// appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRecord {
    pub input: Bytes,
    pub success: bool,
    pub output: Bytes,
    pub events: Vec<EventRecord>,
}

/// Exportable trace envelope for a recorded unit's full history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallTrace {
    #[serde(default = "default_version")]
    version: u32,
    pub identity: Identity,
    pub records: Vec<CallRecord>,
}

fn default_version() -> u32 {
    TRACE_VERSION
}

impl CallTrace {
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string_pretty(self).map_err(|e| e.to_string())
    }

    /// Rejects traces with a version newer than this build understands.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let trace: CallTrace = serde_json::from_str(json).map_err(|e| e.to_string())?;
        if trace.version > MAX_SUPPORTED_VERSION {
            return Err(format!(
                "unsupported CallTrace version {}: max supported is {}",
                trace.version, MAX_SUPPORTED_VERSION
            ));
        }
        Ok(trace)
    }
}

#[derive(Default)]
struct RecorderState {
    history: Vec<CallRecord>,
    capture_reverts: bool,
}

/// Recording wrapper installed at the proxy identity. Every dispatch to
/// that identity passes through here, so nested and reentrant calls are
/// recorded too, each record appended when its forwarding call returns.
struct RecordingUnit {
    inner: Rc<dyn UnitLogic>,
    state: Rc<RefCell<RecorderState>>,
}

impl UnitLogic for RecordingUnit {
    fn call(&self, ctx: &mut CallContext<'_>, input: &Bytes) -> UnitResult {
        let mark = ctx.journal_len();
        let result = self.inner.call(ctx, input);

        // Only events the recorded unit itself produced; events bubbled
        // up from nested calls to other identities are discarded.
        let own = ctx.identity();
        let events: Vec<EventRecord> = ctx
            .journal_since(mark)
            .into_iter()
            .filter(|event| event.origin == own)
            .collect();

        let (success, output) = match &result {
            Ok(output) => (true, output.clone()),
            Err(payload) => (false, payload.clone()),
        };

        let mut state = self.state.borrow_mut();
        state.history.push(CallRecord {
            input: input.clone(),
            success,
            output,
            events,
        });

        match result {
            Ok(output) => Ok(output),
            // Capture mode converts the failure into an ordinary return
            // carrying the failure payload; the record keeps the truth.
            Err(payload) if state.capture_reverts => Ok(payload),
            Err(payload) => Err(payload),
        }
    }
}

/// Handle over a recorded unit.
///
/// The history and the capture-mode switch are shared with the installed
/// wrapper; execution is single-threaded, so plain `Rc<RefCell<_>>` is
/// all the synchronization this needs.
pub struct RecordingProxy {
    identity: Identity,
    state: Rc<RefCell<RecorderState>>,
}

impl RecordingProxy {
    /// Install `logic` at a seed-derived identity behind a recording
    /// wrapper and return the handle.
    pub fn install<E: Environment>(env: &mut E, seed: &str, logic: Rc<dyn UnitLogic>) -> Self {
        let identity = Identity::from_seed(seed);
        let state = Rc::new(RefCell::new(RecorderState::default()));
        env.install_unit(
            identity,
            Rc::new(RecordingUnit {
                inner: logic,
                state: Rc::clone(&state),
            }),
        );
        RecordingProxy { identity, state }
    }

    pub fn identity(&self) -> Identity {
        self.identity
    }

    /// Forward one call to the recorded unit. With capture mode off, a
    /// failed call surfaces as [`HarnessError::Reverted`] with the exact
    /// original payload; the record is appended either way.
    pub fn handle<E: Environment>(&self, env: &mut E, input: Bytes) -> Result<Bytes, HarnessError> {
        let outcome = env.call(self.identity, 0, input);
        if outcome.success {
            Ok(outcome.output)
        } else {
            Err(HarnessError::Reverted(outcome.output))
        }
    }

    /// Switch to capture mode: from now on failed forwarded calls return
    /// normally, carrying the failure payload. One-way; nothing in this
    /// core resets it.
    pub fn capture_reverts(&self) {
        self.state.borrow_mut().capture_reverts = true;
    }

    pub fn call_count(&self) -> usize {
        self.state.borrow().history.len()
    }

    /// Bounds-checked read of the i-th call record, in execution order.
    pub fn calls(&self, index: usize) -> Result<CallRecord, HarnessError> {
        let state = self.state.borrow();
        state
            .history
            .get(index)
            .cloned()
            .ok_or(HarnessError::OutOfRange {
                index,
                len: state.history.len(),
            })
    }

    /// Export the full history as a trace envelope.
    pub fn trace(&self) -> CallTrace {
        CallTrace {
            version: TRACE_VERSION,
            identity: self.identity,
            records: self.state.borrow().history.clone(),
        }
    }
}
