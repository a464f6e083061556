//! The registration-through-product-creation flow.
//!
//! | step              | fatal on failure                |
//! |-------------------|---------------------------------|
//! | identity          | -                               |
//! | register          | yes                             |
//! | resolve_otp       | yes                             |
//! | verify            | yes                             |
//! | authenticate      | yes                             |
//! | create_resource   | no (warning, timeouts included) |
//! | audit             | no (warning, timeouts included) |

use crate::client::{ApiClient, ApiResponse};
use crate::discovery::discover_registration;
use crate::identity::Identity;
use crate::oracle::{OracleError, ResourceLookup, StateOracle};
use anyhow::{Context, Result};
use flowprobe_config::{DiagnosticRule, HarnessConfig};
use flowprobe_context::{keys, SharedContext};
use flowprobe_core::{FlowBuilder, FlowError, Step, StepResult};
use flowprobe_logger::{Logger, Severity};
use regex::Regex;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;

pub mod step_names {
    pub const IDENTITY: &str = "identity";
    pub const REGISTER: &str = "register";
    pub const RESOLVE_OTP: &str = "resolve_otp";
    pub const VERIFY: &str = "verify";
    pub const AUTHENTICATE: &str = "authenticate";
    pub const CREATE_RESOURCE: &str = "create_resource";
    pub const AUDIT: &str = "audit";
}

use step_names::*;

#[derive(Clone)]
pub struct SignupFlow {
    config: Arc<HarnessConfig>,
    client: ApiClient,
    oracle: Arc<dyn StateOracle>,
    logger: Logger,
    diagnostics: Arc<Vec<(Regex, DiagnosticRule)>>,
}

impl SignupFlow {
    pub fn new(
        config: Arc<HarnessConfig>,
        client: ApiClient,
        oracle: Arc<dyn StateOracle>,
        logger: Logger,
    ) -> Result<Self> {
        let diagnostics = config
            .resource
            .diagnostics
            .iter()
            .map(|rule| {
                Regex::new(&rule.pattern)
                    .map(|re| (re, rule.clone()))
                    .with_context(|| {
                        format!("Invalid diagnostic pattern: {}", rule.pattern)
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            config,
            client,
            oracle,
            logger,
            diagnostics: Arc::new(diagnostics),
        })
    }

    /// All seven steps for `identity`, in order
    pub fn builder(&self, identity: &Identity) -> FlowBuilder {
        let identity = identity.clone();
        let password = self.config.identity.password.clone();

        FlowBuilder::new()
            .logger(self.logger.clone())
            .step_timeout(self.config.http.step_timeout())
            .push(
                Step::new(
                    IDENTITY,
                    "Generating identity...",
                    move |ctx| record_identity(ctx, identity, password),
                )
                .reporting(Severity::Info),
            )
            .named_step(REGISTER, "Registering user...", {
                let flow = self.clone();
                move |ctx| async move { StepResult::from(flow.register(ctx).await) }
            })
            .quiet_step(RESOLVE_OTP, "Retrieving OTP from the state store...", {
                let flow = self.clone();
                move |ctx| async move { StepResult::from(flow.resolve_otp(ctx).await) }
            })
            .named_step(VERIFY, "Verifying OTP...", {
                let flow = self.clone();
                move |ctx| async move { StepResult::from(flow.verify(ctx).await) }
            })
            .named_step(AUTHENTICATE, "Logging in...", {
                let flow = self.clone();
                move |ctx| async move { StepResult::from(flow.authenticate(ctx).await) }
            })
            .soft_step(CREATE_RESOURCE, "Posting a product...", {
                let flow = self.clone();
                move |ctx| async move { flow.create_resource(ctx).await }
            })
            .soft_step(AUDIT, "Checking the state store for the product...", {
                let flow = self.clone();
                move |ctx| async move { flow.audit(ctx).await }
            })
    }

    async fn register(&self, ctx: SharedContext) -> Result<String, FlowError> {
        let (email, username, password) = {
            let guard = ctx.lock().await;
            (
                guard.require_variable(keys::EMAIL)?,
                guard.require_variable(keys::USERNAME)?,
                guard.require_variable(keys::PASSWORD)?,
            )
        };
        let identity = &self.config.identity;
        let payload = json!({
            "username": username,
            "email": email,
            "password": password,
            "first_name": identity.first_name,
            "last_name": identity.last_name,
            "re_password": password,
        });

        let endpoints = &self.config.endpoints;
        if endpoints.discover_registration {
            let mut paths = vec![endpoints.register.path.clone()];
            paths.extend(
                endpoints
                    .candidate_registration_paths
                    .iter()
                    .filter(|p| **p != endpoints.register.path)
                    .cloned(),
            );
            let found =
                discover_registration(&self.client, &paths, &payload, &self.logger)
                    .await?;
            return Ok(format!(
                "Registration successful at {} ({})",
                found.path, found.status
            ));
        }

        let response = self
            .client
            .post_json(&endpoints.register.path, &payload, None)
            .await?;
        expect(&response, &endpoints.register)?;
        Ok(format!("Registration request sent for {email}."))
    }

    async fn resolve_otp(&self, ctx: SharedContext) -> Result<String, FlowError> {
        let email = ctx.lock().await.require_variable(keys::EMAIL)?;

        match self.consult(self.oracle.find_otp(&email)).await? {
            Some(otp) => {
                ctx.lock().await.set_variable(keys::OTP, otp.as_str());
                Ok(format!("Found OTP for {email}: {otp}"))
            }
            None => Err(FlowError::NotFoundInStore {
                what: "user".to_string(),
                key: email,
                phase: "after registration".to_string(),
            }),
        }
    }

    /// Store lookups share the per-request bound of the HTTP calls.
    async fn consult<T, F>(&self, lookup: F) -> Result<T, FlowError>
    where
        F: Future<Output = Result<T, OracleError>>,
    {
        let limit = self.config.http.request_timeout();
        match tokio::time::timeout(limit, lookup).await {
            Ok(result) => {
                result.map_err(|err| FlowError::connection(self.oracle.name(), err))
            }
            Err(_) => Err(FlowError::connection(
                self.oracle.name(),
                format!("lookup timed out after {}ms", limit.as_millis()),
            )),
        }
    }

    async fn verify(&self, ctx: SharedContext) -> Result<String, FlowError> {
        let (email, otp) = {
            let guard = ctx.lock().await;
            (
                guard.require_variable(keys::EMAIL)?,
                guard.require_variable(keys::OTP)?,
            )
        };

        let endpoint = &self.config.endpoints.verify;
        let response = self
            .client
            .post_json(&endpoint.path, &json!({ "email": email, "otp": otp }), None)
            .await?;
        expect(&response, endpoint)?;
        Ok("Email verified.".to_string())
    }

    async fn authenticate(&self, ctx: SharedContext) -> Result<String, FlowError> {
        let (email, password) = {
            let guard = ctx.lock().await;
            (
                guard.require_variable(keys::EMAIL)?,
                guard.require_variable(keys::PASSWORD)?,
            )
        };

        let token = &self.config.endpoints.token;
        let response = self
            .client
            .post_json(
                &token.endpoint.path,
                &json!({ "email": email, "password": password }),
                None,
            )
            .await?;
        expect(&response, &token.endpoint)?;

        let access = non_empty_string(response.field(&token.access_field)).ok_or_else(
            || FlowError::MissingExpectedField {
                endpoint: token.endpoint.path.clone(),
                field: token.access_field.clone(),
            },
        )?;
        let refresh = non_empty_string(response.field(&token.refresh_field));

        let mut guard = ctx.lock().await;
        guard.set_variable(keys::ACCESS_TOKEN, access);
        if let Some(refresh) = refresh {
            guard.set_variable(keys::REFRESH_TOKEN, refresh);
        }
        Ok("Login successful, token obtained.".to_string())
    }

    /// Never halts the run: a rejected or unreachable creation is a warning.
    async fn create_resource(&self, ctx: SharedContext) -> StepResult {
        let captured = {
            let guard = ctx.lock().await;
            guard.require_variable(keys::ACCESS_TOKEN).and_then(|token| {
                guard
                    .require_variable(keys::USERNAME)
                    .map(|username| (token, username))
            })
        };
        let (token, username) = match captured {
            Ok(values) => values,
            Err(missing) => return StepResult::Failure(missing.into()),
        };

        let resource = &self.config.resource;
        let payload = json!({
            "title": format!("{} {}", resource.title_prefix, username),
            "description": resource.description,
            "price": resource.price,
            "condition": resource.condition,
            "category": resource.category,
            "location": resource.location,
        });

        let endpoint = &self.config.endpoints.products;
        let response = match self
            .client
            .post_json(&endpoint.path, &payload, Some(&token))
            .await
        {
            Ok(response) => response,
            Err(err) => return StepResult::Warning(err),
        };

        if endpoint.accepts(response.status) {
            return match response.field("id").as_ref().and_then(json_id) {
                Some(id) => {
                    ctx.lock()
                        .await
                        .set_variable(keys::RESOURCE_ID, id.to_string());
                    StepResult::success(format!(
                        "Product posted successfully, id {id}."
                    ))
                }
                None => StepResult::success(
                    "Product posted successfully, no id in response.",
                ),
            };
        }

        let hint = self.diagnose(&response).await;
        StepResult::Warning(FlowError::SchemaMismatch {
            status: response.status,
            body: response.excerpt(),
            hint,
        })
    }

    /// First matching diagnostic rule, plus a category lookup when the rule
    /// is about the category reference.
    async fn diagnose(&self, response: &ApiResponse) -> Option<String> {
        let (_, rule) = self
            .diagnostics
            .iter()
            .find(|(pattern, _)| pattern.is_match(&response.body))?;

        if rule.field.as_deref() == Some("category") {
            self.check_category().await;
        }
        Some(rule.hint.clone())
    }

    async fn check_category(&self) {
        let category = match &self.config.resource.category {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let path = format!(
            "{}/{}/",
            self.config.endpoints.categories_path.trim_end_matches('/'),
            category
        );

        match self.client.get(&path, None).await {
            Ok(response) if response.is_success() => self.logger.debug(format!(
                "Category {category} exists; the rejection has another cause."
            )),
            Ok(response) => self.logger.debug(format!(
                "Category {category} not found ({}). Categories may need seeding.",
                response.status
            )),
            Err(err) => self
                .logger
                .debug(format!("Category {category} check failed: {err}")),
        }
    }

    /// Runs whether or not creation produced an id. Never halts the run.
    async fn audit(&self, ctx: SharedContext) -> StepResult {
        let lookup = {
            let guard = ctx.lock().await;
            let email = match guard.require_variable(keys::EMAIL) {
                Ok(email) => email,
                Err(missing) => return StepResult::Failure(missing.into()),
            };
            ResourceLookup {
                email,
                resource_id: guard
                    .get_variable(keys::RESOURCE_ID)
                    .and_then(|id| id.parse().ok()),
                access_token: guard.get_variable(keys::ACCESS_TOKEN).cloned(),
            }
        };
        let expected = &self.config.resource.expected_status;

        match self.consult(self.oracle.find_resource(&lookup)).await {
            Ok(Some(record)) if record.status == *expected => {
                StepResult::success(format!(
                    "Product {} '{}' is in '{}' status as expected.",
                    record.id, record.title, record.status
                ))
            }
            Ok(Some(record)) => StepResult::Warning(FlowError::StatusMismatch {
                resource: format!("product {}", record.id),
                expected: expected.clone(),
                actual: record.status,
            }),
            Ok(None) => StepResult::Warning(FlowError::NotFoundInStore {
                what: "product".to_string(),
                key: lookup
                    .resource_id
                    .map(|id| id.to_string())
                    .unwrap_or(lookup.email),
                phase: "after creation".to_string(),
            }),
            Err(err) => StepResult::Warning(err),
        }
    }
}

async fn record_identity(
    ctx: SharedContext,
    identity: Identity,
    password: String,
) -> StepResult {
    let mut guard = ctx.lock().await;
    guard.set_variable(keys::EMAIL, identity.email.as_str());
    guard.set_variable(keys::USERNAME, identity.username.as_str());
    guard.set_variable(keys::PASSWORD, password);
    StepResult::success(format!("Using identity {}", identity.email))
}

fn expect(
    response: &ApiResponse,
    endpoint: &flowprobe_config::Endpoint,
) -> Result<(), FlowError> {
    if endpoint.accepts(response.status) {
        Ok(())
    } else {
        Err(response.unexpected(&endpoint.path))
    }
}

fn non_empty_string(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s),
        _ => None,
    }
}

fn json_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
