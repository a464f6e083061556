//! # flowprobe Context
//!
//! Per-run state shared between steps: captured values, step logs and the
//! halt marker. Created empty when a run starts and dropped when it ends.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Capture keys written by the signup flow.
pub mod keys {
    pub const EMAIL: &str = "identity.email";
    pub const USERNAME: &str = "identity.username";
    pub const PASSWORD: &str = "identity.password";
    pub const OTP: &str = "otp";
    pub const ACCESS_TOKEN: &str = "auth.access";
    pub const REFRESH_TOKEN: &str = "auth.refresh";
    pub const RESOURCE_ID: &str = "resource.id";
}

/// A step asked for a capture no earlier step produced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("capture '{0}' was never set by an earlier step")]
pub struct MissingVariable(pub String);

#[derive(Debug, Clone)]
pub struct FlowContext {
    pub trace_id: String,
    pub ok: bool,
    pub errors: Vec<String>,
    pub step_logs: Vec<StepLog>,
    pub variables: HashMap<String, String>,
    /// Name of the step that stopped the run, if any.
    pub halted_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StepLog {
    pub step_name: String,
    pub start_time: Instant,
    pub end_time: Option<Instant>,
    pub status: StepStatus,
    pub message: Option<String>,
    pub trace_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Running,
    Success,
    Warning,
    Failed,
    Timeout,
}

impl Default for FlowContext {
    fn default() -> Self {
        Self::new_with_trace_id(Uuid::new_v4().to_string())
    }
}

impl FlowContext {
    pub fn new_with_trace_id(trace_id: String) -> Self {
        Self {
            trace_id,
            ok: true,
            errors: Vec::new(),
            step_logs: Vec::new(),
            variables: HashMap::new(),
            halted_at: None,
        }
    }

    pub fn start_step(&mut self, step_name: String) {
        tracing::debug!(trace_id = %self.trace_id, step = %step_name, "step starting");

        self.step_logs.push(StepLog {
            step_name,
            start_time: Instant::now(),
            end_time: None,
            status: StepStatus::Running,
            message: None,
            trace_id: self.trace_id.clone(),
        });
    }

    pub fn end_step_success(&mut self, step_name: &str) {
        self.finish_step(step_name, StepStatus::Success, None);
    }

    pub fn end_step_warning(&mut self, step_name: &str, reason: &str) {
        self.finish_step(step_name, StepStatus::Warning, Some(reason));
    }

    pub fn end_step_failed(&mut self, step_name: &str, error: &str) {
        self.finish_step(step_name, StepStatus::Failed, Some(error));
        self.errors
            .push(format!("[{}] {}: {}", self.trace_id, step_name, error));
    }

    pub fn end_step_timeout(&mut self, step_name: &str, error: &str) {
        self.finish_step(step_name, StepStatus::Timeout, Some(error));
        self.errors
            .push(format!("[{}] {}: timeout", self.trace_id, step_name));
    }

    /// Marks the run as stopped by `step_name`. Later steps never start.
    pub fn halt(&mut self, step_name: &str) {
        self.ok = false;
        self.halted_at = Some(step_name.to_string());
        tracing::debug!(trace_id = %self.trace_id, step = %step_name, "run halted");
    }

    fn finish_step(
        &mut self,
        step_name: &str,
        status: StepStatus,
        message: Option<&str>,
    ) {
        if let Some(log) = self
            .step_logs
            .iter_mut()
            .rev()
            .find(|log| log.step_name == step_name)
        {
            let end = Instant::now();
            log.end_time = Some(end);
            log.status = status;
            log.message = message.map(str::to_string);

            tracing::debug!(
                trace_id = %self.trace_id,
                step = %step_name,
                status = ?status,
                duration_ms = end.duration_since(log.start_time).as_millis() as u64,
                "step finished"
            );
        }
    }

    pub fn set_variable(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        tracing::debug!(trace_id = %self.trace_id, key = %key, "set capture");

        self.variables.insert(key, value.into());
    }

    pub fn get_variable(&self, key: &str) -> Option<&String> {
        self.variables.get(key)
    }

    /// Like `get_variable`, but a missing capture is an error, never a blank.
    pub fn require_variable(&self, key: &str) -> Result<String, MissingVariable> {
        self.variables
            .get(key)
            .cloned()
            .ok_or_else(|| MissingVariable(key.to_string()))
    }

    pub fn count_status(&self, status: StepStatus) -> usize {
        self.step_logs
            .iter()
            .filter(|log| log.status == status)
            .count()
    }

    pub fn print_summary(&self) {
        tracing::info!(
            trace_id = %self.trace_id,
            total_steps = self.step_logs.len(),
            success = self.count_status(StepStatus::Success),
            warning = self.count_status(StepStatus::Warning),
            failed = self.count_status(StepStatus::Failed),
            timeout = self.count_status(StepStatus::Timeout),
            halted_at = self.halted_at.as_deref().unwrap_or("-"),
            "flow summary"
        );

        for error in &self.errors {
            tracing::info!(error = %error);
        }
    }
}

pub type SharedContext = Arc<Mutex<FlowContext>>;
