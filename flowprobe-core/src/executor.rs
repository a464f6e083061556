use crate::{FlowError, Step, StepResult};
use flowprobe_context::SharedContext;
use flowprobe_logger::Logger;
use std::time::Duration;

/// Runs steps in order, stopping at the first fatal failure.
pub struct FlowExecutor {
    logger: Logger,
    step_timeout: Option<Duration>,
}

impl FlowExecutor {
    pub fn new(logger: Logger) -> Self {
        Self {
            logger,
            step_timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.step_timeout = timeout;
        self
    }

    /// Execute a list of steps sequentially.
    ///
    /// Warnings and non-fatal failures are logged and the loop moves on. A
    /// fatal failure logs exactly one ERROR line, marks the context halted and
    /// returns without starting the remaining steps.
    pub async fn execute_steps(&self, steps: Vec<Step>, context: SharedContext) {
        let total = steps.len();

        for (index, step) in steps.into_iter().enumerate() {
            let Step {
                name,
                banner,
                success_severity,
                soft,
                run,
            } = step;

            self.logger
                .step(format!("[{}/{}] {}", index + 1, total, banner));
            context.lock().await.start_step(name.clone());

            let fut = run(context.clone());
            let (result, timed_out) = match self.step_timeout {
                Some(limit) => match tokio::time::timeout(limit, fut).await {
                    Ok(result) => (result, false),
                    Err(_) => {
                        let err = FlowError::StepTimeout {
                            step: name.clone(),
                            limit_ms: limit.as_millis() as u64,
                        };
                        let result = if soft {
                            StepResult::Warning(err)
                        } else {
                            StepResult::Failure(err)
                        };
                        (result, true)
                    }
                },
                None => (fut.await, false),
            };

            let mut guard = context.lock().await;
            match &result {
                StepResult::Success(message) => {
                    guard.end_step_success(&name);
                    self.logger.log(success_severity, message.clone());
                }
                StepResult::Warning(err) => {
                    guard.end_step_warning(&name, &err.to_string());
                    self.logger.warn(err.to_string());
                }
                StepResult::Failure(err) => {
                    if timed_out {
                        guard.end_step_timeout(&name, &err.to_string());
                    } else {
                        guard.end_step_failed(&name, &err.to_string());
                    }
                    self.logger.error(err.to_string());
                }
            }

            if result.halts() {
                guard.halt(&name);
                tracing::debug!(step = %name, remaining = total - index - 1, "skipping remaining steps");
                return;
            }
        }
    }
}
