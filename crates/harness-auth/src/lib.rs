//! # Harness Auth
//!
//! Browser login for the event harness: the OAuth2 authorization-code
//! flow with PKCE, cookie-backed sessions, silent token refresh, and
//! directory claims lookup.
//!
//! ## Overview
//!
//! - **Provider client**: [`ConfidentialClient`] builds authorization
//!   redirects and exchanges callback codes and refresh tokens against
//!   the identity provider. [`IdentityProvider`] is the seam tests use
//!   to swap in a fake.
//! - **Stores**: [`PendingFlowStore`] holds flows between redirect and
//!   callback with one-shot consumption; [`SessionStore`] holds live
//!   sessions keyed by cookie value.
//! - **Controller**: [`AuthFlowController`] ties the pieces together and
//!   is what an HTTP layer calls.
//! - **Directory**: [`DirectoryClient`] fetches display names and
//!   app-role assignments once per login.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use harness_auth::{
//!     AuthFlowController, ConfidentialClient, PendingFlowStore, ProviderConfig, SessionStore,
//! };
//!
//! async fn login_redirect() -> harness_auth::AuthResult<String> {
//!     let config = ProviderConfig::new("client-id", Some("client-secret".to_string()), "tenant-id");
//!     let provider = Arc::new(ConfidentialClient::new(config)?);
//!     let controller = AuthFlowController::new(
//!         provider,
//!         Arc::new(PendingFlowStore::new()),
//!         Arc::new(SessionStore::new()),
//!     );
//!
//!     let target = controller
//!         .initiate_login(&["User.Read".to_string()], "https://app.example.com/token")
//!         .await?;
//!     // Send the browser to target.auth_uri; the callback lands on /token.
//!     Ok(target.auth_uri)
//! }
//! ```
//!
//! ## Flow
//!
//! ```text
//! GET /login ──> initiate_login ──> 302 to provider
//!                                      │
//!                     callback with code + state
//!                                      │
//! GET|POST /token ──> complete_login ──> session cookie, 302 to /
//!                                      │
//! any request ──> resolve_session ──> silent refresh ──> principal
//! ```

pub mod claims;
pub mod config;
pub mod controller;
pub mod directory;
pub mod error;
pub mod flows;
pub mod provider;
pub mod session;

pub use claims::{Account, IdTokenClaims, Principal, TokenBundle};
pub use config::{ProviderConfig, DEFAULT_SCOPES};
pub use controller::{AuthFlowController, RedirectTarget};
pub use directory::{ClaimsSource, DirectoryClaims, DirectoryClient};
pub use error::{AuthError, AuthResult};
pub use flows::PendingFlowStore;
pub use provider::{AuthCodeFlow, ConfidentialClient, IdentityProvider, TokenGrant};
pub use session::{Session, SessionStore};
