pub mod control;
pub mod error;
pub mod probe;
pub mod record;

pub use control::Controller;
pub use error::HarnessError;
pub use probe::CapabilityProbe;
pub use record::{CallRecord, CallTrace, RecordingProxy, TRACE_VERSION};
