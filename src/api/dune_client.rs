//! HTTP client for the Dune execution API.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

use crate::queries::Query;

use super::types::{ExecuteResponse, ExecutionResult, StatusResponse};

const DUNE_API_BASE: &str = "https://api.dune.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const STATE_COMPLETED: &str = "QUERY_STATE_COMPLETED";
const STATE_FAILED: &str = "QUERY_STATE_FAILED";
const STATE_CANCELLED: &str = "QUERY_STATE_CANCELLED";

/// Backend contract for query execution: submit-and-wait, or fetch the
/// result of a job that was already submitted.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Submit `query` and poll at `ping_secs` until the backend reports a
    /// terminal state, returning the realized handle.
    async fn refresh(&self, query: &Query, ping_secs: u64) -> Result<ExecutionResult>;

    /// Fetch the result of an existing execution. Never submits.
    async fn get_result(&self, job_id: &str) -> Result<ExecutionResult>;
}

/// Client for the Dune execution API (submit, poll, results).
pub struct DuneClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl DuneClient {
    /// Create a new client against the production API.
    pub fn new(api_key: &str) -> Result<Self> {
        Self::with_base_url(api_key, DUNE_API_BASE.to_string())
    }

    /// Create with custom base URL (for testing).
    pub fn with_base_url(api_key: &str, base_url: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url,
        })
    }

    async fn execute(&self, query: &Query) -> Result<ExecuteResponse> {
        let url = format!("{}/api/v1/query/{}/execute", self.base_url, query.query_id);

        debug!(url = %url, "Submitting query execution");

        let response = self
            .client
            .post(&url)
            .header("X-Dune-API-Key", &self.api_key)
            .json(&json!({ "query_parameters": query.request_parameters() }))
            .send()
            .await
            .context("Failed to submit query execution")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Execute request failed: {} - {}", status, body);
        }

        response
            .json()
            .await
            .context("Failed to parse execute response")
    }

    async fn status(&self, execution_id: &str) -> Result<StatusResponse> {
        let url = format!("{}/api/v1/execution/{}/status", self.base_url, execution_id);

        let response = self
            .client
            .get(&url)
            .header("X-Dune-API-Key", &self.api_key)
            .send()
            .await
            .context("Failed to fetch execution status")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Status request failed: {} - {}", status, body);
        }

        response
            .json()
            .await
            .context("Failed to parse status response")
    }

    async fn results(&self, execution_id: &str) -> Result<ExecutionResult> {
        let url = format!("{}/api/v1/execution/{}/results", self.base_url, execution_id);

        debug!(url = %url, "Fetching execution results");

        let response = self
            .client
            .get(&url)
            .header("X-Dune-API-Key", &self.api_key)
            .send()
            .await
            .context("Failed to fetch execution results")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Results request failed: {} - {}", status, body);
        }

        response
            .json()
            .await
            .context("Failed to parse results response")
    }
}

#[async_trait]
impl QueryEngine for DuneClient {
    async fn refresh(&self, query: &Query, ping_secs: u64) -> Result<ExecutionResult> {
        let submitted = self.execute(query).await?;

        loop {
            let status = self.status(&submitted.execution_id).await?;
            match status.state.as_str() {
                STATE_COMPLETED => break,
                STATE_FAILED | STATE_CANCELLED => bail!(
                    "Execution {} ended in state {}",
                    submitted.execution_id,
                    status.state
                ),
                _ => tokio::time::sleep(Duration::from_secs(ping_secs)).await,
            }
        }

        self.results(&submitted.execution_id).await
    }

    async fn get_result(&self, job_id: &str) -> Result<ExecutionResult> {
        self.results(job_id).await
    }
}
