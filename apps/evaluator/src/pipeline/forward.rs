use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{info, warn};

use crate::models::report::EvaluationReport;

const FORWARD_TIMEOUT: Duration = Duration::from_secs(120);

/// Hands a finished report to the downstream system. Delivery is best-effort:
/// implementations log failures and never return them.
#[async_trait]
pub trait ReportForwarder: Send + Sync {
    async fn forward(&self, report: &EvaluationReport);
}

/// POSTs the report JSON to a fixed endpoint.
#[derive(Clone)]
pub struct HttpForwarder {
    client: Client,
    url: String,
}

impl HttpForwarder {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(FORWARD_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client"),
            url: url.into(),
        }
    }
}

#[async_trait]
impl ReportForwarder for HttpForwarder {
    async fn forward(&self, report: &EvaluationReport) {
        match self.client.post(&self.url).json(report).send().await {
            Ok(response) if response.status().is_success() => {
                info!(
                    application_id = report.application_id,
                    "Evaluation report forwarded to {}", self.url
                );
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                warn!(
                    application_id = report.application_id,
                    "Report forwarding returned {status}: {body}"
                );
            }
            Err(e) => {
                warn!(
                    application_id = report.application_id,
                    "Report forwarding failed: {e}"
                );
            }
        }
    }
}

/// Used when no forwarding endpoint is configured.
#[derive(Debug, Clone, Default)]
pub struct NoopForwarder;

#[async_trait]
impl ReportForwarder for NoopForwarder {
    async fn forward(&self, report: &EvaluationReport) {
        tracing::debug!(
            application_id = report.application_id,
            "No forwarding endpoint configured"
        );
    }
}
