//! RDF patch log client
//!
//! Talks to an RDF Delta patch log server: datasource and log metadata
//! through the `$/rpc` endpoint, patch bodies through the per-datasource
//! routes.

use std::time::Duration;

use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument};

use crate::error::{RdfError, RdfResult};
use crate::patch::Patch;

/// Metadata for a datasource hosted by the patch log server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceDescription {
    /// Datasource id
    pub id: String,
    /// Datasource name
    pub name: String,
    /// Datasource URI
    #[serde(default)]
    pub uri: String,
}

/// Metadata for a datasource's patch log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogDescription {
    /// Log id (matches the datasource id)
    pub id: String,
    /// Lowest version held by the log
    #[serde(default)]
    pub min_version: i64,
    /// Highest version held by the log
    #[serde(default)]
    pub max_version: i64,
    /// Id of the most recent patch, absent while the log is empty
    #[serde(default)]
    pub latest: Option<String>,
}

/// Client for an RDF Delta patch log server.
#[derive(Debug, Clone)]
pub struct DeltaClient {
    client: Client,
    base_url: String,
}

impl DeltaClient {
    /// Create a client for the given server.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");
        let base_url: String = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// The configured server base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn rpc<T>(&self, op: &str, arg: serde_json::Value) -> RdfResult<T>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}/$/rpc", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&json!({
                "opid": "",
                "op": op,
                "arg": arg,
            }))
            .send()
            .await
            .map_err(|e| RdfError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RdfError::Delta(status.as_u16(), message));
        }
        response
            .json()
            .await
            .map_err(|e| RdfError::InvalidResponse(e.to_string()))
    }

    /// Describe a datasource by name.
    #[instrument(skip(self))]
    pub async fn describe_datasource(&self, name: &str) -> RdfResult<DataSourceDescription> {
        self.rpc("describe_datasource", json!({ "name": name })).await
    }

    /// Describe a datasource's patch log by datasource id.
    #[instrument(skip(self))]
    pub async fn describe_log(&self, datasource_id: &str) -> RdfResult<LogDescription> {
        self.rpc("describe_log", json!({ "datasource": datasource_id }))
            .await
    }

    /// Fetch one patch body by version.
    #[instrument(skip(self))]
    pub async fn get_log(&self, datasource: &str, version: i64) -> RdfResult<String> {
        let url = format!("{}/{}/{}", self.base_url, datasource, version);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RdfError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RdfError::InvalidResponse(e.to_string()))?;
        if !status.is_success() {
            return Err(RdfError::Delta(status.as_u16(), body));
        }
        Ok(body)
    }

    /// Append a patch to a datasource's log.
    #[instrument(skip(self, patch), fields(patch_id = %patch.id))]
    pub async fn append(&self, datasource: &str, patch: &Patch) -> RdfResult<()> {
        let url = format!("{}/{}", self.base_url, datasource);
        debug!("Appending patch to {}", datasource);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/rdf-patch")
            .body(patch.to_string())
            .send()
            .await
            .map_err(|e| RdfError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RdfError::Delta(status.as_u16(), message));
        }
        Ok(())
    }

    /// Id of the most recent patch on a datasource's log, by name.
    pub async fn latest_patch_id(&self, name: &str) -> RdfResult<Option<String>> {
        let datasource = self.describe_datasource(name).await?;
        let log = self.describe_log(&datasource.id).await?;
        Ok(log.latest)
    }

    /// Body of the most recent patch on a datasource's log, by name.
    pub async fn latest_log(&self, name: &str) -> RdfResult<String> {
        let datasource = self.describe_datasource(name).await?;
        let log = self.describe_log(&datasource.id).await?;
        self.get_log(name, log.max_version).await
    }
}
