//! Privileged read paths into backend state.
//!
//! The signup flow needs two facts the public API does not expose: the OTP
//! mailed at registration and the moderation status of the created product.
//! A [`StateOracle`] answers both, either straight from the database or
//! through an authenticated API.

mod api;
mod memory;
#[cfg(feature = "postgres")]
mod postgres;

pub use api::ApiOracle;
pub use memory::MemoryOracle;
#[cfg(feature = "postgres")]
pub use postgres::PostgresOracle;

use crate::client::ApiClient;
use async_trait::async_trait;
use flowprobe_config::{HarnessConfig, OracleConfig};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("state store unavailable: {0}")]
    Unavailable(String),

    #[error("state lookup failed: {0}")]
    Query(String),

    #[error("lookup not supported: {0}")]
    Unsupported(String),
}

/// A product row as the store records it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    pub id: i64,
    pub title: String,
    pub status: String,
}

/// Which product to look for. `resource_id` wins when present, otherwise the
/// most recent product of the seller with `email`.
#[derive(Debug, Clone, Default)]
pub struct ResourceLookup {
    pub email: String,
    pub resource_id: Option<i64>,
    /// User token, for oracles that read through the user's own API
    pub access_token: Option<String>,
}

#[async_trait]
pub trait StateOracle: Send + Sync {
    fn name(&self) -> &'static str;

    /// OTP stored for the user with `email`, `None` when no such user exists
    async fn find_otp(&self, email: &str) -> Result<Option<String>, OracleError>;

    async fn find_resource(
        &self,
        lookup: &ResourceLookup,
    ) -> Result<Option<ResourceRecord>, OracleError>;
}

/// Build the oracle described by `config.oracle`
pub fn from_config(
    config: &HarnessConfig,
) -> Result<Arc<dyn StateOracle>, OracleError> {
    match &config.oracle {
        #[cfg(feature = "postgres")]
        OracleConfig::Postgres {
            database_url,
            users_table,
            products_table,
        } => Ok(Arc::new(PostgresOracle::connect_lazy(
            database_url,
            users_table,
            products_table,
            config.http.request_timeout(),
        )?)),
        #[cfg(not(feature = "postgres"))]
        OracleConfig::Postgres { .. } => Err(OracleError::Unsupported(
            "built without the postgres feature".to_string(),
        )),
        OracleConfig::AdminApi {
            base_url,
            admin_token,
            otp_path,
            my_products_path,
        } => {
            let base = base_url
                .clone()
                .unwrap_or_else(|| config.target.backend_url.clone());
            let client = ApiClient::new(base, config.http.request_timeout())
                .map_err(|e| OracleError::Unavailable(e.to_string()))?;
            Ok(Arc::new(ApiOracle::new(
                client,
                admin_token.clone(),
                otp_path.clone(),
                my_products_path.clone(),
            )))
        }
    }
}
