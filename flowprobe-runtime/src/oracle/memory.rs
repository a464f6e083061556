use super::{OracleError, ResourceLookup, ResourceRecord, StateOracle};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// In-process oracle, seeded by the caller.
#[derive(Debug, Default)]
pub struct MemoryOracle {
    otps: Mutex<HashMap<String, String>>,
    products: Mutex<Vec<(String, ResourceRecord)>>,
    failure: Mutex<Option<OracleError>>,
}

impl MemoryOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_otp(&self, email: impl Into<String>, otp: impl Into<String>) {
        self.otps
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(email.into(), otp.into());
    }

    pub fn insert_product(&self, seller_email: impl Into<String>, record: ResourceRecord) {
        self.products
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push((seller_email.into(), record));
    }

    /// Every later lookup fails with `error`
    pub fn fail_with(&self, error: OracleError) {
        *self.failure.lock().unwrap_or_else(|p| p.into_inner()) = Some(error);
    }

    fn check_failure(&self) -> Result<(), OracleError> {
        match self.failure.lock().unwrap_or_else(|p| p.into_inner()).clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl StateOracle for MemoryOracle {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn find_otp(&self, email: &str) -> Result<Option<String>, OracleError> {
        self.check_failure()?;
        Ok(self
            .otps
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(email)
            .cloned())
    }

    async fn find_resource(
        &self,
        lookup: &ResourceLookup,
    ) -> Result<Option<ResourceRecord>, OracleError> {
        self.check_failure()?;
        let products = self.products.lock().unwrap_or_else(|p| p.into_inner());
        let found = match lookup.resource_id {
            Some(id) => products.iter().find(|(_, r)| r.id == id),
            None => products
                .iter()
                .filter(|(seller, _)| seller == &lookup.email)
                .max_by_key(|(_, r)| r.id),
        };
        Ok(found.map(|(_, record)| record.clone()))
    }
}
