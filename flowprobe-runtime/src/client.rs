//! Thin JSON client over reqwest. Every request carries the configured
//! timeout; transport errors and timeouts become `ConnectionFailure`.

use flowprobe_core::FlowError;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use std::time::Duration;

const BODY_EXCERPT_CHARS: usize = 500;

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: Client,
}

/// Status and raw body of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.body).ok()
    }

    /// Top-level field of a JSON object body
    pub fn field(&self, name: &str) -> Option<serde_json::Value> {
        self.json()?.get(name).cloned()
    }

    /// Body cut down for log lines
    pub fn excerpt(&self) -> String {
        excerpt(&self.body)
    }

    pub fn unexpected(&self, endpoint: &str) -> FlowError {
        FlowError::UnexpectedStatus {
            endpoint: endpoint.to_string(),
            status: self.status,
            body: self.excerpt(),
        }
    }
}

pub(crate) fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(BODY_EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, FlowError> {
        let base_url = base_url.into();
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FlowError::connection(base_url.as_str(), e))?;

        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URLs pass through; paths are joined to the base url.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
        bearer: Option<&str>,
    ) -> Result<ApiResponse, FlowError> {
        let url = self.url(path);
        tracing::debug!(%url, "POST");
        self.send(path, with_bearer(self.http.post(&url).json(body), bearer))
            .await
    }

    pub async fn get(
        &self,
        path: &str,
        bearer: Option<&str>,
    ) -> Result<ApiResponse, FlowError> {
        self.get_with_query(path, &[], bearer).await
    }

    pub async fn get_with_query(
        &self,
        path: &str,
        query: &[(&str, &str)],
        bearer: Option<&str>,
    ) -> Result<ApiResponse, FlowError> {
        let url = self.url(path);
        tracing::debug!(%url, "GET");
        self.send(path, with_bearer(self.http.get(&url).query(query), bearer))
            .await
    }

    async fn send(
        &self,
        target: &str,
        request: RequestBuilder,
    ) -> Result<ApiResponse, FlowError> {
        let response = request
            .send()
            .await
            .map_err(|e| transport_error(target, e))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(target, e))?;

        tracing::debug!(endpoint = target, status, "response");
        Ok(ApiResponse { status, body })
    }
}

fn with_bearer(request: RequestBuilder, bearer: Option<&str>) -> RequestBuilder {
    match bearer {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

fn transport_error(target: &str, error: reqwest::Error) -> FlowError {
    let reason = if error.is_timeout() {
        format!("request timed out: {error}")
    } else if error.is_connect() {
        format!("connection error: {error}")
    } else {
        format!("http error: {error}")
    };
    FlowError::connection(target, reason)
}
