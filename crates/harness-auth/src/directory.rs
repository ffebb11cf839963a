//! Directory claims lookup
//!
//! Fetches the signed-in user's profile and app-role assignments from the
//! provider's directory API with the access token granted at login. The
//! flow controller consults this once per new session.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};

use harness_rbac::ScopeSet;

use crate::error::{AuthError, AuthResult};

/// Claims fetched from the directory for a signed-in user.
#[derive(Debug, Clone, Default)]
pub struct DirectoryClaims {
    /// Display name, when the profile exposes one
    pub display_name: Option<String>,
    /// App-role ids assigned to the user
    pub roles: ScopeSet,
}

/// Source of directory claims for an access token.
#[async_trait]
pub trait ClaimsSource: Send + Sync {
    /// Fetch directory claims using the given access token.
    async fn fetch_claims(&self, access_token: &str) -> AuthResult<DirectoryClaims>;
}

/// Client for a Microsoft-Graph-style directory API.
#[derive(Debug, Clone)]
pub struct DirectoryClient {
    client: Client,
    base_url: String,
}

impl DirectoryClient {
    /// Default directory API base.
    pub const DEFAULT_BASE_URL: &'static str = "https://graph.microsoft.com/v1.0";

    /// Create a client against the default directory API.
    pub fn new(timeout: Duration) -> Self {
        Self::with_base_url(Self::DEFAULT_BASE_URL, timeout)
    }

    /// Create a client against a specific directory API base.
    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Self {
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

    /// Fetch the signed-in user's profile.
    #[instrument(skip(self, access_token))]
    pub async fn me(&self, access_token: &str) -> AuthResult<UserProfile> {
        let url = format!("{}/me", self.base_url);
        debug!("Fetching user profile");

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", access_token))
            .send()
            .await
            .map_err(|e| AuthError::ClaimsFetch(format!("Profile request failed: {}", e)))?;

        self.handle_response(response).await
    }

    /// Fetch the signed-in user's app-role assignments.
    #[instrument(skip(self, access_token))]
    pub async fn app_role_assignments(&self, access_token: &str) -> AuthResult<AppRoleAssignments> {
        let url = format!("{}/me/appRoleAssignments", self.base_url);
        debug!("Fetching app-role assignments");

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", access_token))
            .send()
            .await
            .map_err(|e| AuthError::ClaimsFetch(format!("Role request failed: {}", e)))?;

        self.handle_response(response).await
    }

    async fn handle_response<T>(&self, response: reqwest::Response) -> AuthResult<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            error!("Directory rejected the access token");
            return Err(AuthError::ClaimsFetch("Access token rejected".to_string()));
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!("Directory API error ({}): {}", status.as_u16(), message);
            return Err(AuthError::ClaimsFetch(format!(
                "{}: {}",
                status.as_u16(),
                message
            )));
        }
        response
            .json()
            .await
            .map_err(|e| AuthError::ClaimsFetch(format!("Invalid directory response: {}", e)))
    }
}

#[async_trait]
impl ClaimsSource for DirectoryClient {
    async fn fetch_claims(&self, access_token: &str) -> AuthResult<DirectoryClaims> {
        let profile = self.me(access_token).await?;
        let assignments = self.app_role_assignments(access_token).await?;
        let roles = assignments
            .value
            .into_iter()
            .map(|assignment| assignment.app_role_id)
            .collect();
        Ok(DirectoryClaims {
            display_name: profile.display_name,
            roles,
        })
    }
}

/// Directory user profile. Lossy: only the fields the harness reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    /// Object id
    #[serde(default)]
    pub id: String,
    /// Display name
    #[serde(rename = "displayName", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Login username
    #[serde(
        rename = "userPrincipalName",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_principal_name: Option<String>,
}

/// App-role assignment collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppRoleAssignments {
    /// The assignments
    #[serde(default)]
    pub value: Vec<AppRoleAssignment>,
}

/// A single app-role assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppRoleAssignment {
    /// Assignment id
    #[serde(default)]
    pub id: String,
    /// The assigned app-role id
    #[serde(rename = "appRoleId")]
    pub app_role_id: String,
    /// Display name of the resource application
    #[serde(
        rename = "resourceDisplayName",
        skip_serializing_if = "Option::is_none"
    )]
    pub resource_display_name: Option<String>,
}
