use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvError {
    #[error("unmet expectation: {0}")]
    UnmetExpectation(String),

    #[error("expectation violated: {0}")]
    ExpectationViolated(String),
}
