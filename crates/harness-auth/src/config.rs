//! Identity provider configuration
//!
//! Configuration for the OAuth2 client: application credentials, the
//! provider tenant, and optional endpoint overrides for deployments that
//! do not talk to the default Microsoft identity platform endpoints.

use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};

/// Default scopes requested when a login does not name any.
pub const DEFAULT_SCOPES: &[&str] = &["User.Read"];

/// Identity provider configuration.
///
/// The default endpoints target the Microsoft identity platform v2.0
/// (`https://login.microsoftonline.com/{tenant}/oauth2/v2.0/...`). Each
/// endpoint can be overridden individually, which is how tests point the
/// client at a local mock server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Application (client) id
    pub client_id: String,
    /// Client secret for the confidential client, if one is configured
    #[serde(skip_serializing)]
    pub client_secret: Option<String>,
    /// Directory (tenant) id
    pub tenant_id: String,
    /// Scopes requested when a login does not name any
    pub scopes: Vec<String>,
    /// Response mode requested from the provider (e.g. `form_post`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mode: Option<String>,
    /// Override for the authorization endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorize_endpoint: Option<String>,
    /// Override for the token endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_endpoint: Option<String>,
    /// Override for the logout endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logout_endpoint: Option<String>,
    /// Timeout for requests to the provider, in seconds
    pub timeout_secs: u64,
}

impl ProviderConfig {
    /// Create a configuration for the given application and tenant.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: Option<String>,
        tenant_id: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret,
            tenant_id: tenant_id.into(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            response_mode: None,
            authorize_endpoint: None,
            token_endpoint: None,
            logout_endpoint: None,
            timeout_secs: 30,
        }
    }

    /// Load configuration from `CLIENT_ID`, `CLIENT_SECRET`, and `TENANT_ID`.
    pub fn from_env() -> AuthResult<Self> {
        let client_id = std::env::var("CLIENT_ID")
            .map_err(|_| AuthError::ProviderConfig("CLIENT_ID is not set".to_string()))?;
        let client_secret = std::env::var("CLIENT_SECRET").ok();
        let tenant_id = std::env::var("TENANT_ID")
            .map_err(|_| AuthError::ProviderConfig("TENANT_ID is not set".to_string()))?;
        Ok(Self::new(client_id, client_secret, tenant_id))
    }

    /// Set the default scopes.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Set the response mode requested from the provider.
    pub fn with_response_mode(mut self, mode: impl Into<String>) -> Self {
        self.response_mode = Some(mode.into());
        self
    }

    /// Override the authorization endpoint.
    pub fn with_authorize_endpoint(mut self, url: impl Into<String>) -> Self {
        self.authorize_endpoint = Some(url.into());
        self
    }

    /// Override the token endpoint.
    pub fn with_token_endpoint(mut self, url: impl Into<String>) -> Self {
        self.token_endpoint = Some(url.into());
        self
    }

    /// Override the logout endpoint.
    pub fn with_logout_endpoint(mut self, url: impl Into<String>) -> Self {
        self.logout_endpoint = Some(url.into());
        self
    }

    /// Set the provider request timeout.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// The tenant authority base URL.
    pub fn authority(&self) -> String {
        format!("https://login.microsoftonline.com/{}", self.tenant_id)
    }

    /// The effective authorization endpoint.
    pub fn authorize_url(&self) -> String {
        self.authorize_endpoint
            .clone()
            .unwrap_or_else(|| format!("{}/oauth2/v2.0/authorize", self.authority()))
    }

    /// The effective token endpoint.
    pub fn token_url(&self) -> String {
        self.token_endpoint
            .clone()
            .unwrap_or_else(|| format!("{}/oauth2/v2.0/token", self.authority()))
    }

    /// The effective logout endpoint, without query parameters.
    pub fn logout_url(&self) -> String {
        self.logout_endpoint
            .clone()
            .unwrap_or_else(|| format!("{}/oauth2/v2.0/logout", self.authority()))
    }

    /// Check that the configuration is usable.
    ///
    /// Failures here are fatal: a process with a broken provider
    /// configuration must not serve logins.
    pub fn validate(&self) -> AuthResult<()> {
        if self.client_id.trim().is_empty() {
            return Err(AuthError::ProviderConfig(
                "client_id must not be empty".to_string(),
            ));
        }
        let needs_tenant = self.authorize_endpoint.is_none()
            || self.token_endpoint.is_none()
            || self.logout_endpoint.is_none();
        if needs_tenant && self.tenant_id.trim().is_empty() {
            return Err(AuthError::ProviderConfig(
                "tenant_id must not be empty unless all endpoints are overridden".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoints_use_tenant_authority() {
        let config = ProviderConfig::new("app-id", None, "tenant-id");
        assert_eq!(
            config.authorize_url(),
            "https://login.microsoftonline.com/tenant-id/oauth2/v2.0/authorize"
        );
        assert_eq!(
            config.token_url(),
            "https://login.microsoftonline.com/tenant-id/oauth2/v2.0/token"
        );
        assert_eq!(
            config.logout_url(),
            "https://login.microsoftonline.com/tenant-id/oauth2/v2.0/logout"
        );
    }

    #[test]
    fn test_endpoint_overrides_win() {
        let config = ProviderConfig::new("app-id", None, "tenant-id")
            .with_token_endpoint("http://127.0.0.1:9999/token");
        assert_eq!(config.token_url(), "http://127.0.0.1:9999/token");
        assert_eq!(
            config.authorize_url(),
            "https://login.microsoftonline.com/tenant-id/oauth2/v2.0/authorize"
        );
    }

    #[test]
    fn test_default_scopes() {
        let config = ProviderConfig::new("app-id", None, "tenant-id");
        assert_eq!(config.scopes, vec!["User.Read".to_string()]);
    }

    #[test]
    fn test_validate_rejects_empty_client_id() {
        let config = ProviderConfig::new("", None, "tenant-id");
        let err = config.validate().unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_validate_rejects_empty_tenant_without_overrides() {
        let config = ProviderConfig::new("app-id", None, "");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_empty_tenant_with_full_overrides() {
        let config = ProviderConfig::new("app-id", None, "")
            .with_authorize_endpoint("http://localhost/a")
            .with_token_endpoint("http://localhost/t")
            .with_logout_endpoint("http://localhost/l");
        assert!(config.validate().is_ok());
    }
}
