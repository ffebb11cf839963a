//! Shared application state
//!
//! Route handlers never touch stores or provider clients directly; they
//! go through the controller and gate held here. Everything is wrapped in
//! `Arc`, so cloning the state per request is cheap.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use harness_auth::{
    AuthFlowController, ClaimsSource, ConfidentialClient, DirectoryClient, PendingFlowStore,
    SessionStore,
};
use harness_broker::{BrokerClient, MemoryBroker};
use harness_rbac::{AuthorizationGate, ScopeSet};
use harness_rdf::{DeltaClient, PatchRelay, SparqlClient};

use crate::config::HarnessConfig;

/// State shared by all route handlers.
#[derive(Clone)]
pub struct AppState {
    /// Login flow orchestration and session resolution
    pub controller: Arc<AuthFlowController>,
    /// Authorization gate for broker and RDF routes
    pub gate: Arc<AuthorizationGate>,
    /// Broker the produce/peek/consume routes talk to
    pub broker: Arc<dyn BrokerClient>,
    /// SPARQL endpoint client
    pub sparql: Arc<SparqlClient>,
    /// Patch log client
    pub delta: Arc<DeltaClient>,
    /// Consumed-message relay into the patch log
    pub relay: Arc<PatchRelay>,
    /// Application configuration
    pub config: Arc<HarnessConfig>,
}

impl AppState {
    /// Wire up the full application from its configuration.
    ///
    /// Builds the provider client, attaches the directory claims source,
    /// and prepares the broker topic and subscription named in the
    /// settings.
    pub fn from_config(config: HarnessConfig) -> anyhow::Result<Self> {
        config.broker.validate().context("Broker settings")?;
        let timeout = Duration::from_secs(config.provider.timeout_secs);

        let provider = ConfidentialClient::new(config.provider.clone())
            .context("Identity provider client")?;
        let directory: Arc<dyn ClaimsSource> = match config.directory_endpoint {
            Some(ref base_url) => Arc::new(DirectoryClient::with_base_url(base_url.as_str(), timeout)),
            None => Arc::new(DirectoryClient::new(timeout)),
        };
        let controller = AuthFlowController::new(
            Arc::new(provider),
            Arc::new(PendingFlowStore::new()),
            Arc::new(SessionStore::new()),
        )
        .with_claims_source(directory);

        let gate = AuthorizationGate::new(ScopeSet::from_strings(&[config.admin_role.as_str()]));
        let broker = MemoryBroker::new()
            .with_subscription(config.broker.topic.as_str(), config.broker.subscription.as_str());
        let sparql = SparqlClient::new(
            config.sparql_endpoint.as_str(),
            config.sparql_update_endpoint.as_str(),
            timeout,
        );
        let delta = DeltaClient::new(config.delta_endpoint.as_str(), timeout);
        let relay = PatchRelay::new(delta.clone(), config.delta_datasource.as_str());

        Ok(Self {
            controller: Arc::new(controller),
            gate: Arc::new(gate),
            broker: Arc::new(broker),
            sparql: Arc::new(sparql),
            delta: Arc::new(delta),
            relay: Arc::new(relay),
            config: Arc::new(config),
        })
    }
}
