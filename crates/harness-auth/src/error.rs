//! Error types for login and token operations
//!
//! This module defines all error types that can occur while initiating or
//! completing a login flow, refreshing tokens, and fetching directory claims.

use thiserror::Error;

/// Login and token error types.
///
/// These errors cover the full authorization-code flow: configuration
/// problems, callback validation, the code exchange itself, and the
/// directory lookups that follow it.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Provider configuration is missing or malformed
    #[error("Provider configuration error: {0}")]
    ProviderConfig(String),

    /// Callback carried an unknown, expired, or already-used state value
    #[error("Unknown or already-used login state")]
    InvalidState,

    /// The provider rejected the authorization-code or refresh exchange
    #[error("Token exchange failed: {0}")]
    ExchangeFailed(String),

    /// Directory claims could not be fetched for the signed-in user
    #[error("Claims fetch failed: {0}")]
    ClaimsFetch(String),

    /// Transport-level failure talking to the provider
    #[error("Provider error: {0}")]
    Provider(String),
}

impl AuthError {
    /// Returns the HTTP status code this error maps to.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::ProviderConfig(_) => 500,
            AuthError::InvalidState => 401,
            AuthError::ExchangeFailed(_) => 401,
            AuthError::ClaimsFetch(_) => 502,
            AuthError::Provider(_) => 502,
        }
    }

    /// Returns a machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::ProviderConfig(_) => "PROVIDER_CONFIG_ERROR",
            AuthError::InvalidState => "INVALID_STATE",
            AuthError::ExchangeFailed(_) => "EXCHANGE_FAILED",
            AuthError::ClaimsFetch(_) => "CLAIMS_FETCH_FAILED",
            AuthError::Provider(_) => "PROVIDER_ERROR",
        }
    }

    /// Whether the process should refuse to start rather than serve requests.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AuthError::ProviderConfig(_))
    }

    /// Whether this error indicates a failure on our side or upstream,
    /// as opposed to a rejectable client request.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            AuthError::ProviderConfig(_) | AuthError::ClaimsFetch(_) | AuthError::Provider(_)
        )
    }
}

/// Result type for login and token operations.
pub type AuthResult<T> = Result<T, AuthError>;
