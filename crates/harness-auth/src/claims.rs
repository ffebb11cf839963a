//! Identity claims, accounts, and token material
//!
//! Data carried through the login flow: the claims read out of a provider
//! id token, the principal derived from them, and the token bundle a
//! session holds on to.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use harness_rbac::ScopeSet;

use crate::error::{AuthError, AuthResult};

/// Claims read from a provider id token.
///
/// This is a lossy view: only the claims the harness consumes are typed,
/// everything else lands in `other`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// Subject identifier
    #[serde(default)]
    pub sub: String,
    /// Directory object id of the user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oid: Option<String>,
    /// Directory (tenant) id the token was issued for
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tid: Option<String>,
    /// Login username
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,
    /// Human-readable display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Nonce echoed back from the authorization request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    /// Group ids the user is a member of
    #[serde(default)]
    pub groups: Vec<String>,
    /// Application roles assigned to the user
    #[serde(default)]
    pub roles: Vec<String>,
    /// Expiration time (seconds since epoch)
    #[serde(default)]
    pub exp: i64,
    /// Remaining claims the provider sent
    #[serde(flatten)]
    pub other: HashMap<String, serde_json::Value>,
}

impl IdTokenClaims {
    /// Decode claims from an id token without verifying its signature.
    ///
    /// The token arrives directly from the token endpoint over TLS as part
    /// of a code exchange we initiated, so it is read here for claim
    /// extraction only, never as proof of authentication on its own.
    pub fn decode_unverified(token: &str) -> AuthResult<Self> {
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.algorithms = vec![Algorithm::RS256, Algorithm::ES256, Algorithm::HS256];

        let data = decode::<IdTokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
            .map_err(|e| AuthError::ExchangeFailed(format!("Invalid id token: {}", e)))?;
        Ok(data.claims)
    }

    /// The best available stable identifier for the user.
    pub fn user_id(&self) -> &str {
        self.oid.as_deref().unwrap_or(&self.sub)
    }
}

/// Handle to an account cached by the provider client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Home account id (`{uid}.{utid}` when the provider returns
    /// client info, otherwise derived from the id token claims)
    pub home_id: String,
    /// Login username
    pub username: String,
}

/// Token material held by a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenBundle {
    /// Bearer access token for downstream API calls
    pub access_token: String,
    /// Token type, normally `Bearer`
    pub token_type: String,
    /// Refresh token, when the provider granted one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Raw id token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    /// Scopes the access token was granted for
    pub scopes: Vec<String>,
    /// Access token expiry
    pub expires_at: DateTime<Utc>,
}

impl TokenBundle {
    /// Whether the access token expires within the given leeway.
    pub fn expires_within(&self, leeway: Duration) -> bool {
        self.expires_at - Utc::now() <= leeway
    }

    /// Whether the access token has already expired.
    pub fn is_expired(&self) -> bool {
        self.expires_within(Duration::zero())
    }
}

/// The authenticated user a session belongs to.
///
/// Identity fields are fixed at login; only token material is refreshed
/// over the session's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    /// Stable user identifier
    pub id: String,
    /// Login username
    pub username: String,
    /// Display name, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Roles granted to the user (directory groups, app roles)
    #[serde(default)]
    pub roles: ScopeSet,
}

impl Principal {
    /// Create a principal with no roles.
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            display_name: None,
            roles: ScopeSet::new(),
        }
    }

    /// Derive a principal from id token claims.
    ///
    /// Group ids and app roles from the token both land in `roles`, so an
    /// authorization gate can require either kind of value.
    pub fn from_claims(claims: &IdTokenClaims) -> Self {
        let username = claims
            .preferred_username
            .clone()
            .unwrap_or_else(|| claims.sub.clone());
        let mut roles = ScopeSet::new();
        for group in &claims.groups {
            roles.insert(group.clone());
        }
        for role in &claims.roles {
            roles.insert(role.clone());
        }
        Self {
            id: claims.user_id().to_string(),
            username,
            display_name: claims.name.clone(),
            roles,
        }
    }

    /// Set the display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Replace the role set.
    pub fn with_roles(mut self, roles: ScopeSet) -> Self {
        self.roles = roles;
        self
    }

    /// Whether the principal holds the given role.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}
