//! Entry points: the signup run, the liveness check and registration
//! discovery. None of them return an error to the caller; whatever escapes
//! a run is reported once as CRITICAL.

use crate::client::ApiClient;
use crate::discovery::{discover_registration, DiscoveredEndpoint};
use crate::health::{HealthProbe, ProbeReport};
use crate::identity::{Identity, IdentityGenerator};
use crate::oracle::StateOracle;
use crate::signup::SignupFlow;
use anyhow::Result;
use flowprobe_config::HarnessConfig;
use flowprobe_context::{FlowContext, StepStatus};
use flowprobe_logger::Logger;
use futures::FutureExt;
use serde_json::json;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use uuid::Uuid;

/// What a run did, for callers and for the summary line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub trace_id: String,
    pub identity: String,
    /// Every step ran (warnings allowed)
    pub completed: bool,
    pub halted_at: Option<String>,
    pub successes: usize,
    pub warnings: usize,
    pub errors: usize,
    /// Set when something escaped the step loop
    pub critical: Option<String>,
}

impl RunSummary {
    fn from_context(identity: &Identity, ctx: &FlowContext) -> Self {
        Self {
            trace_id: ctx.trace_id.clone(),
            identity: identity.email.clone(),
            completed: ctx.halted_at.is_none(),
            halted_at: ctx.halted_at.clone(),
            successes: ctx.count_status(StepStatus::Success),
            warnings: ctx.count_status(StepStatus::Warning),
            errors: ctx.count_status(StepStatus::Failed)
                + ctx.count_status(StepStatus::Timeout),
            critical: None,
        }
    }
}

pub struct FlowRunner {
    config: Arc<HarnessConfig>,
    oracle: Arc<dyn StateOracle>,
    logger: Logger,
}

impl FlowRunner {
    pub fn new(config: HarnessConfig, oracle: Arc<dyn StateOracle>) -> Self {
        Self {
            config: Arc::new(config),
            oracle,
            logger: Logger::new(),
        }
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run the signup flow under a fresh time-based identity
    pub async fn run(&self) -> RunSummary {
        let identity = IdentityGenerator::global()
            .next(&self.config.identity.prefix, &self.config.identity.domain);
        self.run_as(identity).await
    }

    pub async fn run_as(&self, identity: Identity) -> RunSummary {
        let logger = self.logger.with_trace_id(Uuid::new_v4().to_string());
        logger.info(format!("Starting flow for {}", identity.email));

        let outcome =
            AssertUnwindSafe(self.execute(&identity, logger.clone()))
                .catch_unwind()
                .await;

        match outcome {
            Ok(Ok(ctx)) => RunSummary::from_context(&identity, &ctx),
            Ok(Err(err)) => self.crashed(&identity, &logger, format!("{err:#}")),
            Err(panic) => self.crashed(&identity, &logger, panic_message(panic)),
        }
    }

    async fn execute(
        &self,
        identity: &Identity,
        logger: Logger,
    ) -> Result<FlowContext> {
        let client = self.client()?;
        let flow =
            SignupFlow::new(self.config.clone(), client, self.oracle.clone(), logger)?;
        flow.builder(identity).execute().await
    }

    fn crashed(
        &self,
        identity: &Identity,
        logger: &Logger,
        reason: String,
    ) -> RunSummary {
        logger.critical(format!("Flow run crashed: {reason}"));
        RunSummary {
            trace_id: logger.trace_id.clone(),
            identity: identity.email.clone(),
            critical: Some(reason),
            ..RunSummary::default()
        }
    }

    /// Probe backend, frontend and dashboard independently
    pub async fn check_health(&self) -> Vec<ProbeReport> {
        match self.client() {
            Ok(client) => {
                HealthProbe::new(client, HealthProbe::targets_from(&self.config))
                    .probe_all(&self.logger)
                    .await
            }
            Err(err) => {
                self.logger.critical(format!("Health check crashed: {err}"));
                Vec::new()
            }
        }
    }

    /// Try every configured registration path with a fresh identity
    pub async fn discover_registration(&self) -> Option<DiscoveredEndpoint> {
        let client = match self.client() {
            Ok(client) => client,
            Err(err) => {
                self.logger.critical(format!("Discovery crashed: {err}"));
                return None;
            }
        };
        let settings = &self.config.identity;
        let identity =
            IdentityGenerator::global().next(&settings.prefix, &settings.domain);
        let payload = json!({
            "username": identity.username,
            "email": identity.email,
            "password": settings.password,
            "first_name": settings.first_name,
            "last_name": settings.last_name,
            "re_password": settings.password,
        });

        let endpoints = &self.config.endpoints;
        match discover_registration(
            &client,
            &endpoints.candidate_registration_paths,
            &payload,
            &self.logger,
        )
        .await
        {
            Ok(found) => {
                self.logger
                    .success(format!("Registration successful at {}", found.path));
                Some(found)
            }
            Err(err) => {
                self.logger
                    .error(format!("No registration endpoint accepted: {err}"));
                None
            }
        }
    }

    fn client(&self) -> Result<ApiClient, flowprobe_core::FlowError> {
        ApiClient::new(
            self.config.target.backend_url.clone(),
            self.config.http.request_timeout(),
        )
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
