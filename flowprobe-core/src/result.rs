use crate::FlowError;

/// Outcome of a single step. Only the executor branches on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    Success(String),
    Warning(FlowError),
    Failure(FlowError),
}

impl StepResult {
    pub fn success(message: impl Into<String>) -> Self {
        StepResult::Success(message.into())
    }

    /// True when the executor must stop after this result.
    pub fn halts(&self) -> bool {
        matches!(self, StepResult::Failure(err) if err.is_fatal())
    }
}

impl From<Result<String, FlowError>> for StepResult {
    fn from(result: Result<String, FlowError>) -> Self {
        match result {
            Ok(message) => StepResult::Success(message),
            Err(err) => StepResult::Failure(err),
        }
    }
}
