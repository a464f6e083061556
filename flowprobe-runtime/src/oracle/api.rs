use super::{OracleError, ResourceLookup, ResourceRecord, StateOracle};
use crate::client::ApiClient;
use async_trait::async_trait;
use serde_json::Value;

/// Reads backend state over HTTP instead of the database.
///
/// OTPs come from an admin-only endpoint (`GET <otp_path>?email=`) and need
/// an admin token. Products come from the user's own product list, read with
/// the access token captured during login.
pub struct ApiOracle {
    client: ApiClient,
    admin_token: Option<String>,
    otp_path: String,
    my_products_path: String,
}

impl ApiOracle {
    pub fn new(
        client: ApiClient,
        admin_token: Option<String>,
        otp_path: String,
        my_products_path: String,
    ) -> Self {
        Self {
            client,
            admin_token,
            otp_path,
            my_products_path,
        }
    }
}

fn unavailable(error: flowprobe_core::FlowError) -> OracleError {
    OracleError::Unavailable(error.to_string())
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Accepts either a bare list or a paginated `{"results": [...]}` body.
fn product_records(body: &Value) -> Vec<ResourceRecord> {
    let items = match body {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("results") {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        },
        _ => &[],
    };

    items
        .iter()
        .filter_map(|item| {
            Some(ResourceRecord {
                id: as_id(item.get("id")?)?,
                title: item
                    .get("title")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                status: item.get("status").and_then(as_text)?,
            })
        })
        .collect()
}

#[async_trait]
impl StateOracle for ApiOracle {
    fn name(&self) -> &'static str {
        "admin-api"
    }

    async fn find_otp(&self, email: &str) -> Result<Option<String>, OracleError> {
        let token = self.admin_token.as_deref().ok_or_else(|| {
            OracleError::Unsupported("no admin token configured".to_string())
        })?;

        let response = self
            .client
            .get_with_query(&self.otp_path, &[("email", email)], Some(token))
            .await
            .map_err(unavailable)?;

        match response.status {
            404 => Ok(None),
            status if (200..300).contains(&status) => Ok(response
                .json()
                .and_then(|body| {
                    body.get("email_otp").or_else(|| body.get("otp")).cloned()
                })
                .as_ref()
                .and_then(as_text)),
            status => Err(OracleError::Query(format!(
                "{} returned {}",
                self.otp_path, status
            ))),
        }
    }

    async fn find_resource(
        &self,
        lookup: &ResourceLookup,
    ) -> Result<Option<ResourceRecord>, OracleError> {
        let token = lookup.access_token.as_deref().ok_or_else(|| {
            OracleError::Unsupported(
                "product lookup needs the user's access token".to_string(),
            )
        })?;

        let response = self
            .client
            .get(&self.my_products_path, Some(token))
            .await
            .map_err(unavailable)?;
        if !response.is_success() {
            return Err(OracleError::Query(format!(
                "{} returned {}",
                self.my_products_path, response.status
            )));
        }

        let records = response
            .json()
            .map(|body| product_records(&body))
            .unwrap_or_default();

        Ok(match lookup.resource_id {
            Some(id) => records.into_iter().find(|r| r.id == id),
            None => records.into_iter().max_by_key(|r| r.id),
        })
    }
}
