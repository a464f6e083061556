use crate::{Flow, StepResult};
use anyhow::Result;
use flowprobe_context::{FlowContext, SharedContext};
use flowprobe_logger::{Logger, Severity};
use std::{future::Future, pin::Pin, time::Duration};

/// Type alias for step functions
pub type StepFuture = Pin<Box<dyn Future<Output = StepResult> + Send>>;
pub type StepFn = Box<dyn FnOnce(SharedContext) -> StepFuture + Send>;

/// A named unit of the flow.
pub struct Step {
    pub name: String,
    /// Text of the STEP line printed before the step runs
    pub banner: String,
    /// Severity used for the line reporting a successful outcome
    pub success_severity: Severity,
    /// A soft step never halts the run, not even when it times out
    pub soft: bool,
    pub(crate) run: StepFn,
}

impl Step {
    pub fn new<Fut, F>(
        name: impl Into<String>,
        banner: impl Into<String>,
        f: F,
    ) -> Self
    where
        F: FnOnce(SharedContext) -> Fut + Send + 'static,
        Fut: Future<Output = StepResult> + Send + 'static,
    {
        Self {
            name: name.into(),
            banner: banner.into(),
            success_severity: Severity::Success,
            soft: false,
            run: Box::new(move |ctx| Box::pin(f(ctx))),
        }
    }

    /// Report success at DEBUG instead of SUCCESS.
    pub fn quiet(self) -> Self {
        self.reporting(Severity::Debug)
    }

    pub fn reporting(mut self, severity: Severity) -> Self {
        self.success_severity = severity;
        self
    }

    /// Downgrade a timeout of this step to a warning.
    pub fn soft(mut self) -> Self {
        self.soft = true;
        self
    }
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("banner", &self.banner)
            .field("success_severity", &self.success_severity)
            .field("soft", &self.soft)
            .finish()
    }
}

/// Builder for creating flows with a fluent API
pub struct FlowBuilder {
    steps: Vec<Step>,
    logger: Logger,
    step_timeout: Option<Duration>,
}

impl Default for FlowBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowBuilder {
    /// Creates a new FlowBuilder
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            logger: Logger::new(),
            step_timeout: None,
        }
    }

    pub fn logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Upper bound for each step. Expiry halts the run unless the step is soft.
    pub fn step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = Some(timeout);
        self
    }

    /// Adds a named step reporting success as SUCCESS
    pub fn named_step<Fut, F>(
        self,
        name: &str,
        banner: impl Into<String>,
        f: F,
    ) -> Self
    where
        F: FnOnce(SharedContext) -> Fut + Send + 'static,
        Fut: Future<Output = StepResult> + Send + 'static,
    {
        self.push(Step::new(name, banner, f))
    }

    /// Adds a named step reporting success as DEBUG
    pub fn quiet_step<Fut, F>(
        self,
        name: &str,
        banner: impl Into<String>,
        f: F,
    ) -> Self
    where
        F: FnOnce(SharedContext) -> Fut + Send + 'static,
        Fut: Future<Output = StepResult> + Send + 'static,
    {
        self.push(Step::new(name, banner, f).quiet())
    }

    /// Adds a named step that warns instead of halting when it times out
    pub fn soft_step<Fut, F>(
        self,
        name: &str,
        banner: impl Into<String>,
        f: F,
    ) -> Self
    where
        F: FnOnce(SharedContext) -> Fut + Send + 'static,
        Fut: Future<Output = StepResult> + Send + 'static,
    {
        self.push(Step::new(name, banner, f).soft())
    }

    pub fn push(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name.as_str()).collect()
    }

    /// Builds the flow
    pub fn build(self) -> Flow {
        Flow::new(self.steps, self.logger, self.step_timeout)
    }

    /// Builds and executes the flow with a context carrying the logger's trace id
    pub async fn execute(self) -> Result<FlowContext> {
        self.build().execute().await
    }

    pub async fn execute_with_context(
        self,
        context: FlowContext,
    ) -> Result<FlowContext> {
        self.build().execute_with_context(context).await
    }
}
