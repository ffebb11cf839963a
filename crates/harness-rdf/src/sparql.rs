//! SPARQL endpoint client
//!
//! Runs SELECT queries and updates against a SPARQL 1.1 endpoint pair
//! (query endpoint and update endpoint). Three operations are exposed,
//! matching what the harness surfaces: JSON results for programmatic
//! consumers, CSV for display, and form-encoded updates.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{RdfError, RdfResult};

/// A single RDF term in a result binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SparqlTerm {
    /// Term kind: `uri`, `literal`, or `bnode`
    #[serde(rename = "type")]
    pub kind: String,
    /// Term value
    pub value: String,
    /// Literal datatype IRI
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
    /// Literal language tag
    #[serde(rename = "xml:lang", skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

/// Head section of a SELECT result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SparqlHead {
    /// Projected variable names
    #[serde(default)]
    pub vars: Vec<String>,
}

/// Bindings section of a SELECT result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SparqlBindings {
    /// One map per solution, keyed by variable name
    #[serde(default)]
    pub bindings: Vec<HashMap<String, SparqlTerm>>,
}

/// A SPARQL SELECT result in the standard JSON results format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SparqlResults {
    /// Result head
    #[serde(default)]
    pub head: SparqlHead,
    /// Result bindings
    #[serde(default)]
    pub results: SparqlBindings,
}

impl SparqlResults {
    /// Number of solutions.
    pub fn len(&self) -> usize {
        self.results.bindings.len()
    }

    /// Whether the query matched nothing.
    pub fn is_empty(&self) -> bool {
        self.results.bindings.is_empty()
    }
}

/// Client for a SPARQL query/update endpoint pair.
#[derive(Debug, Clone)]
pub struct SparqlClient {
    client: Client,
    query_endpoint: String,
    update_endpoint: String,
}

impl SparqlClient {
    /// Create a client for the given endpoints.
    pub fn new(
        query_endpoint: impl Into<String>,
        update_endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            query_endpoint: query_endpoint.into(),
            update_endpoint: update_endpoint.into(),
        }
    }

    /// The configured query endpoint.
    pub fn query_endpoint(&self) -> &str {
        &self.query_endpoint
    }

    /// The configured update endpoint.
    pub fn update_endpoint(&self) -> &str {
        &self.update_endpoint
    }

    /// Run a SELECT query, returning parsed JSON results.
    #[instrument(skip(self, query))]
    pub async fn select(&self, query: &str) -> RdfResult<SparqlResults> {
        debug!("Running SELECT against {}", self.query_endpoint);
        let response = self
            .client
            .get(&self.query_endpoint)
            .query(&[("query", query)])
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| RdfError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RdfError::Sparql(status.as_u16(), message));
        }
        response
            .json()
            .await
            .map_err(|e| RdfError::InvalidResponse(e.to_string()))
    }

    /// Run a SELECT query, returning the raw CSV text.
    #[instrument(skip(self, query))]
    pub async fn select_csv(&self, query: &str) -> RdfResult<String> {
        debug!("Running CSV SELECT against {}", self.query_endpoint);
        let response = self
            .client
            .post(&self.query_endpoint)
            .header("Content-Type", "application/sparql-query")
            .header("Accept", "text/csv")
            .body(query.to_string())
            .send()
            .await
            .map_err(|e| RdfError::Transport(e.to_string()))?;

        self.read_text(response).await
    }

    /// Run an update, returning the endpoint's response body.
    #[instrument(skip(self, update))]
    pub async fn update(&self, update: &str) -> RdfResult<String> {
        debug!("Running update against {}", self.update_endpoint);
        let response = self
            .client
            .post(&self.update_endpoint)
            .form(&[("update", update)])
            .send()
            .await
            .map_err(|e| RdfError::Transport(e.to_string()))?;

        self.read_text(response).await
    }

    async fn read_text(&self, response: reqwest::Response) -> RdfResult<String> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RdfError::InvalidResponse(e.to_string()))?;
        if !status.is_success() {
            return Err(RdfError::Sparql(status.as_u16(), body));
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_results_deserialize_standard_json_format() {
        let body = r#"{
            "head": {"vars": ["s", "p", "o"]},
            "results": {"bindings": [
                {
                    "s": {"type": "uri", "value": "http://example.com/a"},
                    "p": {"type": "uri", "value": "http://example.com/b"},
                    "o": {"type": "literal", "value": "c", "xml:lang": "en"}
                }
            ]}
        }"#;
        let results: SparqlResults = serde_json::from_str(body).unwrap();
        assert_eq!(results.head.vars, vec!["s", "p", "o"]);
        assert_eq!(results.len(), 1);
        let object = &results.results.bindings[0]["o"];
        assert_eq!(object.kind, "literal");
        assert_eq!(object.lang.as_deref(), Some("en"));
    }

    #[test]
    fn test_empty_results() {
        let results: SparqlResults = serde_json::from_str("{}").unwrap();
        assert!(results.is_empty());
    }
}
