//! End-to-end scenarios driving the controller, proxy and probe against
//! the in-memory reference environment.

use std::rc::Rc;

use crucible_env::{
    Bytes, CallContext, EmitFilter, Environment, Identity, MemoryEnvironment, UnitLogic,
    UnitResult,
};
use crucible_harness::{CapabilityProbe, Controller, RecordingProxy};

fn bytes(raw: &[u8]) -> Bytes {
    Bytes::from(raw)
}

/// Echoes, or reverts when the input starts with 0xFF.
struct Flaky;

impl UnitLogic for Flaky {
    fn call(&self, _ctx: &mut CallContext<'_>, input: &Bytes) -> UnitResult {
        if input.as_slice().first() == Some(&0xFF) {
            Err(input.clone())
        } else {
            Ok(input.clone())
        }
    }
}

/// Emits one event carrying the input as data.
struct Emitter;

impl UnitLogic for Emitter {
    fn call(&self, ctx: &mut CallContext<'_>, input: &Bytes) -> UnitResult {
        ctx.emit(vec![bytes(b"t1")], input.clone());
        Ok(Bytes::new())
    }
}

#[test]
fn expect_call_met_by_later_matching_call() {
    let mut env = MemoryEnvironment::new();
    let target = Identity::from_seed("target");
    env.install_unit(target, Rc::new(Flaky));
    let unrelated = Identity::from_seed("unrelated");
    env.install_unit(unrelated, Rc::new(Flaky));

    Controller::new(&mut env).expect_call(target, bytes(b"needle"));

    env.call(unrelated, 0, bytes(b"noise"));
    env.call(target, 0, bytes(b"needle"));

    assert!(env.finish().is_ok());
}

#[test]
fn expect_call_without_matching_call_is_reported() {
    let mut env = MemoryEnvironment::new();
    let target = Identity::from_seed("target");
    env.install_unit(target, Rc::new(Flaky));

    Controller::new(&mut env).expect_call(target, bytes(b"needle"));
    env.call(target, 0, bytes(b"something else"));

    assert!(env.finish().is_err());
}

#[test]
fn expect_revert_through_recording_proxy() {
    let mut env = MemoryEnvironment::new();
    let proxy = RecordingProxy::install(&mut env, "proxy", Rc::new(Flaky));

    let payload = bytes(&[0xFF, 0xAA]);
    Controller::new(&mut env).expect_revert_payload(payload.clone());

    // The environment consumes the expected failure, so the proxy call
    // comes back as an ordinary success with empty output.
    let returned = proxy.handle(&mut env, payload.clone()).unwrap();
    assert!(returned.is_empty());

    // The trace still holds the truth about the forwarded call.
    let record = proxy.calls(0).unwrap();
    assert!(!record.success);
    assert_eq!(record.output, payload);

    assert!(env.finish().is_ok());
}

#[test]
fn snapshot_roundtrip_restores_mutated_parameters() {
    let mut env = MemoryEnvironment::new();
    let snap = {
        let mut control = Controller::new(&mut env);
        control.timestamp(100).block_number(10).chain_id(1);
        control.snapshot()
    };

    let restored = {
        let mut control = Controller::new(&mut env);
        control.timestamp(9_999).block_number(77).chain_id(5);
        control.revert_to_snapshot(snap)
    };
    assert!(restored);

    assert_eq!(env.timestamp(), 100);
    assert_eq!(env.block_number(), 10);
    assert_eq!(env.chain_id(), 1);

    // The identifier was consumed by the rollback.
    assert!(!Controller::new(&mut env).revert_to_snapshot(snap));
}

#[test]
fn mocked_call_shadows_real_logic_until_cleared() {
    let mut env = MemoryEnvironment::new();
    let target = Identity::from_seed("target");
    env.install_unit(target, Rc::new(Flaky));

    Controller::new(&mut env).mock_call(target, bytes(b"in"), bytes(b"mocked"));

    assert_eq!(env.call(target, 0, bytes(b"in")).output, bytes(b"mocked"));
    // A different payload is unaffected by the mock.
    assert_eq!(env.call(target, 0, bytes(b"other")).output, bytes(b"other"));

    Controller::new(&mut env).clear_mocked_calls();
    assert_eq!(env.call(target, 0, bytes(b"in")).output, bytes(b"in"));
}

#[test]
fn expect_emit_satisfied_by_unit_under_test() {
    let mut env = MemoryEnvironment::new();
    let emitter = Identity::from_seed("emitter");
    env.install_unit(emitter, Rc::new(Emitter));

    Controller::new(&mut env).expect_emit(EmitFilter::data_only().from_emitter(emitter));

    // Template emission, then the matching emission from the exercised
    // logic.
    env.call(emitter, 0, bytes(b"expected"));
    env.call(emitter, 0, bytes(b"expected"));

    assert!(env.finish().is_ok());
}

#[test]
fn probe_through_controller_in_both_contexts() {
    let mut env = MemoryEnvironment::new();
    CapabilityProbe::initialize(&mut env);

    let in_static = env.static_scope(|env| {
        let mut control = Controller::new(env);
        control.init_probe();
        control.is_static().unwrap()
    });
    assert!(in_static);

    let mut control = Controller::new(&mut env);
    control.init_probe();
    assert!(!control.is_static().unwrap());
}

#[test]
fn recorded_logs_capture_only_the_recorded_window() {
    let mut env = MemoryEnvironment::new();
    let emitter = Identity::from_seed("emitter");
    env.install_unit(emitter, Rc::new(Emitter));

    env.call(emitter, 0, bytes(b"before recording"));
    env.start_log_recording();
    env.call(emitter, 0, bytes(b"recorded"));

    let logs = env.recorded_logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].data, bytes(b"recorded"));
    assert_eq!(logs[0].origin, emitter);
}
