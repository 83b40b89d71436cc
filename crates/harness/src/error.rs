use crucible_env::Bytes;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HarnessError {
    /// A forwarded call reverted while capture mode was off. Carries the
    /// exact original revert payload.
    #[error("call reverted: {0:?}")]
    Reverted(Bytes),

    #[error("call record index {index} out of range: {len} recorded")]
    OutOfRange { index: usize, len: usize },

    #[error("capability probe used before initialize")]
    ProbeUninitialized,
}
