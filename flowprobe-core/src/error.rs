use flowprobe_context::MissingVariable;
use thiserror::Error;

/// Everything a step can report. Fatal variants stop the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// Transport error or timeout
    #[error("could not reach {target}: {reason}")]
    ConnectionFailure { target: String, reason: String },

    /// A step ran past the per-step bound; fatal unless the step is soft
    #[error("step '{step}' timed out after {limit_ms}ms")]
    StepTimeout { step: String, limit_ms: u64 },

    #[error("{endpoint} returned {status}: {body}")]
    UnexpectedStatus {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("{endpoint} response has no '{field}' field")]
    MissingExpectedField { endpoint: String, field: String },

    #[error("{what} '{key}' not found {phase}")]
    NotFoundInStore {
        what: String,
        key: String,
        /// When the lookup happened, e.g. "after registration"
        phase: String,
    },

    #[error("{0}")]
    MissingCapture(#[from] MissingVariable),

    /// The target accepted the request shape only partially
    #[error("creation rejected with {status}: {body}{}", hint_suffix(.hint))]
    SchemaMismatch {
        status: u16,
        body: String,
        hint: Option<String>,
    },

    #[error("{resource} status is '{actual}', expected '{expected}'")]
    StatusMismatch {
        resource: String,
        expected: String,
        actual: String,
    },

    /// Caught once at the top of a run
    #[error("unhandled: {0}")]
    Unhandled(String),
}

fn hint_suffix(hint: &Option<String>) -> String {
    match hint {
        Some(hint) => format!(" (hint: {hint})"),
        None => String::new(),
    }
}

impl FlowError {
    pub fn connection(target: impl Into<String>, reason: impl ToString) -> Self {
        FlowError::ConnectionFailure {
            target: target.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the run must stop after this error.
    pub fn is_fatal(&self) -> bool {
        match self {
            FlowError::ConnectionFailure { .. }
            | FlowError::StepTimeout { .. }
            | FlowError::UnexpectedStatus { .. }
            | FlowError::MissingExpectedField { .. }
            | FlowError::NotFoundInStore { .. }
            | FlowError::MissingCapture(_)
            | FlowError::Unhandled(_) => true,
            FlowError::SchemaMismatch { .. }
            | FlowError::StatusMismatch { .. } => false,
        }
    }
}
