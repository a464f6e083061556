use crate::{FlowExecutor, Step};
use anyhow::Result;
use flowprobe_context::FlowContext;
use flowprobe_logger::Logger;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Represents a flow that can be executed
pub struct Flow {
    steps: Vec<Step>,
    logger: Logger,
    step_timeout: Option<Duration>,
}

impl Flow {
    pub(crate) fn new(
        steps: Vec<Step>,
        logger: Logger,
        step_timeout: Option<Duration>,
    ) -> Self {
        Self {
            steps,
            logger,
            step_timeout,
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Execute the flow with a fresh context tagged with the logger's trace id
    pub async fn execute(self) -> Result<FlowContext> {
        let context = FlowContext::new_with_trace_id(self.logger.trace_id.clone());
        self.execute_with_context(context).await
    }

    /// Execute the flow with a custom context
    pub async fn execute_with_context(
        self,
        context: FlowContext,
    ) -> Result<FlowContext> {
        let shared_context = Arc::new(Mutex::new(context));
        let executor =
            FlowExecutor::new(self.logger).with_timeout(self.step_timeout);

        executor
            .execute_steps(self.steps, shared_context.clone())
            .await;

        let final_context = Arc::try_unwrap(shared_context)
            .map_err(|_| anyhow::anyhow!("Failed to unwrap shared context"))?
            .into_inner();

        final_context.print_summary();
        Ok(final_context)
    }
}
