use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, error, info};

use crate::config::PuppetDbConfig;
use crate::error::{GlueError, Result};
use crate::http::{build_client, failure_parts};

const QUERY_PATH: &str = "/pdb/query/v4";

/// Client for the PuppetDB v4 query endpoint.
pub struct PuppetDbClient {
    client: Client,
    query_url: String,
}

impl PuppetDbClient {
    /// Connects over mutual TLS using the certificate layout of `config.ssl_dir`.
    pub fn new(config: &PuppetDbConfig) -> Result<Self> {
        let client = build_client(config.request_timeout, Some(&config.tls_files()))?;
        Ok(Self::with_client(client, &config.base_url()))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            query_url: format!("{}{QUERY_PATH}", base_url.trim_end_matches('/')),
        }
    }

    /// Runs a PQL query and decodes the returned JSON array.
    pub async fn query<T: DeserializeOwned>(&self, query: &str) -> Result<Vec<T>> {
        debug!(url = %self.query_url, query = %query, "Querying PuppetDB.");

        let response = self
            .client
            .post(&self.query_url)
            .json(&json!({ "query": query }))
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = failure_parts(response).await;
            error!(status = %status, body = %body, "PuppetDB rejected the query.");
            return Err(GlueError::Query { status, body });
        }

        let bytes = response.bytes().await?;
        let rows: Vec<T> = serde_json::from_slice(&bytes).map_err(|e| GlueError::Decode {
            context: "PuppetDB query response",
            source: e,
        })?;
        info!(count = rows.len(), "PuppetDB query returned rows.");
        Ok(rows)
    }
}
