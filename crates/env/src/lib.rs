pub mod error;
pub mod expectation;
pub mod gateway;
pub mod memory;
pub mod types;
pub mod unit;

pub use error::EnvError;
pub use expectation::{CallExpectation, EmitExpectation, EmitFilter, RevertExpectation};
pub use gateway::Environment;
pub use memory::{BlockParams, MemoryEnvironment};
pub use types::{Bytes, CallOutcome, EventRecord, Identity, MockKey, Selector, SnapshotId};
pub use unit::{CallContext, MutationRejected, UnitLogic, UnitResult};
