//! # flowprobe Core
//!
//! Step results, the error taxonomy and the sequential flow executor.

mod error;
mod executor;
mod flow;
mod flow_builder;
mod result;

#[cfg(test)]
mod tests;

pub use error::FlowError;
pub use executor::FlowExecutor;
pub use flow::Flow;
pub use flow_builder::{FlowBuilder, Step, StepFn, StepFuture};
pub use result::StepResult;

/// Prelude module for core functionality
pub mod prelude {
    pub use crate::{
        Flow, FlowBuilder, FlowError, FlowExecutor, Step, StepResult,
    };
    pub use flowprobe_context::{FlowContext, SharedContext, StepStatus};
    pub use flowprobe_logger::{Logger, Severity};
}
