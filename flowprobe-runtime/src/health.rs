//! Liveness probing of the backend and the two front-end origins.
//! Each target is probed on its own; one being down never stops the rest.

use crate::client::ApiClient;
use flowprobe_config::HarnessConfig;
use flowprobe_logger::Logger;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeStatus {
    Up,
    /// Reachable, but answered with something other than 200
    Unexpected(u16),
    Down(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub target: ProbeTarget,
    pub status: ProbeStatus,
}

impl ProbeReport {
    pub fn is_up(&self) -> bool {
        self.status == ProbeStatus::Up
    }
}

pub struct HealthProbe {
    client: ApiClient,
    targets: Vec<ProbeTarget>,
}

impl HealthProbe {
    pub fn new(client: ApiClient, targets: Vec<ProbeTarget>) -> Self {
        Self { client, targets }
    }

    /// Backend health path plus whichever front-end origins are configured
    pub fn targets_from(config: &HarnessConfig) -> Vec<ProbeTarget> {
        let backend = config.target.backend_url.trim_end_matches('/');
        let mut targets = vec![ProbeTarget {
            label: "Backend".to_string(),
            url: format!("{backend}{}", config.target.health_path),
        }];
        if let Some(url) = &config.target.frontend_url {
            targets.push(ProbeTarget {
                label: "Frontend".to_string(),
                url: url.clone(),
            });
        }
        if let Some(url) = &config.target.dashboard_url {
            targets.push(ProbeTarget {
                label: "Dashboard".to_string(),
                url: url.clone(),
            });
        }
        targets
    }

    pub async fn probe_all(&self, logger: &Logger) -> Vec<ProbeReport> {
        let mut reports = Vec::with_capacity(self.targets.len());
        for target in &self.targets {
            let status = match self.client.get(&target.url, None).await {
                Ok(response) if response.status == 200 => {
                    logger.success(format!("{} is UP", target.label));
                    ProbeStatus::Up
                }
                Ok(response) => {
                    logger.warn(format!(
                        "{} returned {}",
                        target.label, response.status
                    ));
                    ProbeStatus::Unexpected(response.status)
                }
                Err(err) => {
                    logger.error(format!("{} check failed: {err}", target.label));
                    ProbeStatus::Down(err.to_string())
                }
            };
            reports.push(ProbeReport {
                target: target.clone(),
                status,
            });
        }
        reports
    }
}
