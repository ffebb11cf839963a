//! Application configuration
//!
//! One struct assembling everything the web app reads from the
//! environment: identity provider credentials, broker settings, SPARQL
//! and patch-log endpoints, the admin role, and the listen address.
//! Loaded once at startup; a missing required variable aborts the start.

use anyhow::Context;

use harness_auth::ProviderConfig;
use harness_broker::BrokerSettings;

/// Default public base URL, used for the callback and post-logout redirect.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/";

/// Configuration for the harness web application.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Identity provider client configuration
    pub provider: ProviderConfig,
    /// Broker topic, subscription, and credentials
    pub broker: BrokerSettings,
    /// Role (directory group or app-role id) required on broker and RDF routes
    pub admin_role: String,
    /// SPARQL query endpoint
    pub sparql_endpoint: String,
    /// SPARQL update endpoint
    pub sparql_update_endpoint: String,
    /// Patch log server base URL
    pub delta_endpoint: String,
    /// Patch log datasource name
    pub delta_datasource: String,
    /// Directory API base override; `None` targets the public directory
    pub directory_endpoint: Option<String>,
    /// Listen host
    pub host: String,
    /// Listen port
    pub port: u16,
    /// Public base URL of this app
    pub base_url: String,
    /// Local development mode: plain-http callback and non-Secure cookies
    pub local_dev: bool,
}

impl HarnessConfig {
    /// Load the full application configuration from the environment.
    ///
    /// Required: `CLIENT_ID`, `TENANT_ID`, `BROKER_TOPIC`,
    /// `BROKER_SUBSCRIPTION`, a broker credential (`BROKER_CONNECTION_STR`
    /// or `BROKER_NAMESPACE`), `SPARQL_ENDPOINT`, `SPARQL_UPDATE_ENDPOINT`,
    /// `RDFDELTA_ENDPOINT`, `RDFDELTA_DATASOURCE`, and `ADMIN_APP_ROLE` or
    /// `GROUP_ID`.
    pub fn from_env() -> anyhow::Result<Self> {
        let provider = ProviderConfig::from_env()
            .context("Identity provider configuration")?
            .with_response_mode("form_post");
        let broker = BrokerSettings::from_env().context("Broker configuration")?;

        let admin_role = std::env::var("ADMIN_APP_ROLE")
            .or_else(|_| std::env::var("GROUP_ID"))
            .context("ADMIN_APP_ROLE or GROUP_ID must be set")?;

        let sparql_endpoint =
            std::env::var("SPARQL_ENDPOINT").context("SPARQL_ENDPOINT is not set")?;
        let sparql_update_endpoint =
            std::env::var("SPARQL_UPDATE_ENDPOINT").context("SPARQL_UPDATE_ENDPOINT is not set")?;
        let delta_endpoint =
            std::env::var("RDFDELTA_ENDPOINT").context("RDFDELTA_ENDPOINT is not set")?;
        let delta_datasource =
            std::env::var("RDFDELTA_DATASOURCE").context("RDFDELTA_DATASOURCE is not set")?;

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = match std::env::var("PORT") {
            Ok(port) => port.parse().context("PORT must be a number")?,
            Err(_) => 8000,
        };
        let base_url = std::env::var("BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let local_dev = std::env::var("LOCAL_DEV")
            .map(|v| !v.is_empty())
            .unwrap_or(false);

        Ok(Self {
            provider,
            broker,
            admin_role,
            sparql_endpoint,
            sparql_update_endpoint,
            delta_endpoint,
            delta_datasource,
            directory_endpoint: std::env::var("DIRECTORY_ENDPOINT").ok(),
            host,
            port,
            base_url,
            local_dev,
        })
    }

    /// The OAuth2 callback URI registered with the provider.
    ///
    /// Outside local development the public base URL is forced to https;
    /// the provider will not redirect credentials to a plain-http origin.
    pub fn callback_uri(&self) -> String {
        if self.local_dev {
            return "http://localhost:8000/token".to_string();
        }
        let base = match self.base_url.strip_prefix("http://") {
            Some(rest) => format!("https://{}", rest),
            None => self.base_url.clone(),
        };
        if base.ends_with('/') {
            format!("{}token", base)
        } else {
            format!("{}/token", base)
        }
    }
}

/// Shorten an identifier for display, keeping both ends.
pub fn redact(value: &str) -> String {
    if value.len() > 22 {
        format!("{}...{}", &value[..9], &value[value.len() - 9..])
    } else {
        "...".to_string()
    }
}
