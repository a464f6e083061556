//! Registration endpoint discovery: POST the same payload to each candidate
//! path in order and keep the first one answering 2xx. Misses are DEBUG
//! noise, not failures. First match wins; nothing checks that the matched
//! endpoint is the intended one.

use crate::client::ApiClient;
use flowprobe_core::FlowError;
use flowprobe_logger::Logger;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredEndpoint {
    pub path: String,
    pub status: u16,
}

/// Returns the first accepting path, or the error of the last attempt.
pub async fn discover_registration(
    client: &ApiClient,
    paths: &[String],
    payload: &Value,
    logger: &Logger,
) -> Result<DiscoveredEndpoint, FlowError> {
    let mut last_error = FlowError::connection(
        client.base_url(),
        "no candidate registration paths configured",
    );

    for path in paths {
        match client.post_json(path, payload, None).await {
            Ok(response) if response.is_success() => {
                return Ok(DiscoveredEndpoint {
                    path: path.clone(),
                    status: response.status,
                });
            }
            Ok(response) => {
                logger.debug(format!(
                    "Registration failed at {path}: {} - {}",
                    response.status,
                    response.excerpt()
                ));
                last_error = response.unexpected(path);
            }
            Err(err) => {
                logger.debug(format!("Failed to connect to {path}: {err}"));
                last_error = err;
            }
        }
    }

    Err(last_error)
}
