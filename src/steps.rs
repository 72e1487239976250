//! Short-circuiting step pipeline shared by the command orchestrators.

use std::panic::{self, AssertUnwindSafe};

/// Terminal outcome of a pipeline step.
#[derive(Debug)]
pub(crate) enum StepFailure {
    /// An expected check failed; the string is the envelope error.
    Check(String),
    /// Something went wrong that no step anticipated.
    Unexpected(anyhow::Error),
}

pub(crate) type StepResult<T> = std::result::Result<T, StepFailure>;

impl StepFailure {
    pub(crate) fn check(error: impl Into<String>) -> Self {
        StepFailure::Check(error.into())
    }
}

impl From<anyhow::Error> for StepFailure {
    fn from(err: anyhow::Error) -> Self {
        StepFailure::Unexpected(err)
    }
}

impl From<std::io::Error> for StepFailure {
    fn from(err: std::io::Error) -> Self {
        StepFailure::Unexpected(err.into())
    }
}

/// Run `pipeline`, turning a panic into an unexpected failure.
pub(crate) fn run_guarded<T>(pipeline: impl FnOnce() -> StepResult<T>) -> StepResult<T> {
    match panic::catch_unwind(AssertUnwindSafe(pipeline)) {
        Ok(outcome) => outcome,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "internal error".to_string());
            Err(StepFailure::Unexpected(anyhow::anyhow!(message)))
        }
    }
}
