//! Login flow orchestration
//!
//! The controller drives the full authorization-code login: initiating a
//! flow, redeeming the callback, resolving session cookies with silent
//! refresh, and logout. It owns no storage; the stores and the provider
//! client are injected and shared with the rest of the process.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::claims::Principal;
use crate::directory::ClaimsSource;
use crate::error::{AuthError, AuthResult};
use crate::flows::PendingFlowStore;
use crate::provider::IdentityProvider;
use crate::session::{Session, SessionStore};

/// Redirect target returned by login initiation.
#[derive(Debug, Clone)]
pub struct RedirectTarget {
    /// Provider authorization URI for the browser redirect
    pub auth_uri: String,
    /// The state value embedded in the URI
    pub state: String,
}

/// Orchestrates the authorization-code login flow.
pub struct AuthFlowController {
    provider: Arc<dyn IdentityProvider>,
    flows: Arc<PendingFlowStore>,
    sessions: Arc<SessionStore>,
    claims_source: Option<Arc<dyn ClaimsSource>>,
}

impl AuthFlowController {
    /// Create a controller over the given provider and stores.
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        flows: Arc<PendingFlowStore>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self {
            provider,
            flows,
            sessions,
            claims_source: None,
        }
    }

    /// Attach a directory claims source, consulted once per login.
    pub fn with_claims_source(mut self, source: Arc<dyn ClaimsSource>) -> Self {
        self.claims_source = Some(source);
        self
    }

    /// The session store this controller writes to.
    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Start a login: build the provider redirect and register the
    /// pending flow under its state value.
    pub async fn initiate_login(
        &self,
        scopes: &[String],
        callback_uri: &str,
    ) -> AuthResult<RedirectTarget> {
        let flow = self
            .provider
            .initiate_auth_code_flow(scopes, callback_uri)
            .await?;
        let target = RedirectTarget {
            auth_uri: flow.auth_uri.clone(),
            state: flow.state.clone(),
        };
        self.flows.insert(flow).await;
        debug!("Initiated login flow with state {}", target.state);
        Ok(target)
    }

    /// Complete a login from provider callback parameters.
    ///
    /// The pending flow is consumed before the exchange, so a state value
    /// is redeemed at most once no matter how many callbacks carry it; the
    /// losers get [`AuthError::InvalidState`]. A failed exchange consumes
    /// the flow too, and never creates a session.
    pub async fn complete_login(&self, params: &HashMap<String, String>) -> AuthResult<Session> {
        let state = params.get("state").ok_or(AuthError::InvalidState)?;
        let flow = match self.flows.take(state).await {
            Some(flow) => flow,
            None => {
                debug!("Callback with unknown or already-used state");
                return Err(AuthError::InvalidState);
            }
        };

        let grant = match self
            .provider
            .acquire_token_by_auth_code_flow(&flow, params)
            .await
        {
            Ok(grant) => grant,
            Err(err) => {
                debug!("Code exchange failed: {}", err);
                return Err(err);
            }
        };

        let mut principal = Principal::from_claims(&grant.claims);
        if let Some(ref source) = self.claims_source {
            let directory = match source.fetch_claims(&grant.tokens.access_token).await {
                Ok(directory) => directory,
                Err(err) => {
                    warn!("Directory claims fetch failed: {}", err);
                    return Err(err);
                }
            };
            if let Some(name) = directory.display_name {
                principal.display_name = Some(name);
            }
            principal.roles.merge(&directory.roles);
        }

        let session = Session::new(principal, grant.account, grant.tokens);
        self.sessions.insert(session.clone()).await;
        debug!("Created session for {}", session.principal.username);
        Ok(session)
    }

    /// Resolve a session id to a live session, silently refreshing its
    /// tokens through the provider.
    ///
    /// Returns `None` for absent, unknown, and expired ids, and when the
    /// provider refuses to refresh. The caller treats `None` as a
    /// signed-out user and starts a fresh login.
    pub async fn resolve_session(&self, session_id: Option<&str>) -> Option<Session> {
        let id = session_id?;
        let session = self.sessions.get(id).await?;

        match self
            .provider
            .acquire_token_silent(&session.tokens.scopes, &session.account)
            .await
        {
            Some(tokens) => self.sessions.update_tokens(id, tokens).await,
            None => {
                debug!(
                    "Silent refresh failed for {}, treating session as signed out",
                    session.principal.username
                );
                None
            }
        }
    }

    /// Remove a session and return the provider logout redirect.
    ///
    /// Removing an already-absent session is not an error; logout is
    /// idempotent.
    pub async fn logout(&self, session_id: &str, post_logout_redirect: &str) -> String {
        if self.sessions.remove(session_id).await.is_some() {
            debug!("Removed session on logout");
        }
        self.provider.logout_url(post_logout_redirect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::{Account, IdTokenClaims, TokenBundle};
    use crate::directory::DirectoryClaims;
    use crate::provider::{AuthCodeFlow, TokenGrant};
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use harness_rbac::ScopeSet;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

    struct FakeProvider {
        counter: AtomicU64,
        fail_exchange: AtomicBool,
        fail_silent: AtomicBool,
    }

    impl FakeProvider {
        fn new() -> Self {
            Self {
                counter: AtomicU64::new(0),
                fail_exchange: AtomicBool::new(false),
                fail_silent: AtomicBool::new(false),
            }
        }

        fn bundle() -> TokenBundle {
            TokenBundle {
                access_token: "access".to_string(),
                token_type: "Bearer".to_string(),
                refresh_token: Some("refresh".to_string()),
                id_token: None,
                scopes: vec!["User.Read".to_string()],
                expires_at: Utc::now() + Duration::hours(1),
            }
        }
    }

    #[async_trait]
    impl IdentityProvider for FakeProvider {
        async fn initiate_auth_code_flow(
            &self,
            scopes: &[String],
            redirect_uri: &str,
        ) -> AuthResult<AuthCodeFlow> {
            let n = self.counter.fetch_add(1, Ordering::SeqCst);
            let state = format!("state-{:04}", n);
            Ok(AuthCodeFlow {
                auth_uri: format!("https://login.example.com/authorize?state={}", state),
                state,
                code_verifier: "verifier".to_string(),
                nonce: "nonce".to_string(),
                redirect_uri: redirect_uri.to_string(),
                scopes: scopes.to_vec(),
                created_at: Utc::now(),
            })
        }

        async fn acquire_token_by_auth_code_flow(
            &self,
            _flow: &AuthCodeFlow,
            params: &HashMap<String, String>,
        ) -> AuthResult<TokenGrant> {
            if self.fail_exchange.load(Ordering::SeqCst) {
                return Err(AuthError::ExchangeFailed(
                    "AADSTS70008: expired authorization code".to_string(),
                ));
            }
            if params.get("code").map(String::as_str) != Some("valid-code") {
                return Err(AuthError::ExchangeFailed("invalid_grant".to_string()));
            }
            let claims = IdTokenClaims {
                sub: "subject-1".to_string(),
                oid: Some("object-1".to_string()),
                preferred_username: Some("ada@example.com".to_string()),
                name: Some("Ada Lovelace".to_string()),
                groups: vec!["group-a".to_string()],
                ..Default::default()
            };
            Ok(TokenGrant {
                account: Account {
                    home_id: "u.t".to_string(),
                    username: "ada@example.com".to_string(),
                },
                claims,
                tokens: Self::bundle(),
            })
        }

        async fn acquire_token_silent(
            &self,
            _scopes: &[String],
            _account: &Account,
        ) -> Option<TokenBundle> {
            if self.fail_silent.load(Ordering::SeqCst) {
                None
            } else {
                let mut bundle = Self::bundle();
                bundle.access_token = "refreshed-access".to_string();
                Some(bundle)
            }
        }

        async fn get_accounts(&self, _username: Option<&str>) -> Vec<Account> {
            vec![]
        }

        fn logout_url(&self, post_logout_redirect: &str) -> String {
            format!(
                "https://login.example.com/logout?post_logout_redirect_uri={}",
                post_logout_redirect
            )
        }
    }

    struct FakeClaimsSource;

    #[async_trait]
    impl ClaimsSource for FakeClaimsSource {
        async fn fetch_claims(&self, _access_token: &str) -> AuthResult<DirectoryClaims> {
            Ok(DirectoryClaims {
                display_name: Some("Ada from the directory".to_string()),
                roles: ScopeSet::from_strings(&["EventHarnessAdmin"]),
            })
        }
    }

    struct FailingClaimsSource;

    #[async_trait]
    impl ClaimsSource for FailingClaimsSource {
        async fn fetch_claims(&self, _access_token: &str) -> AuthResult<DirectoryClaims> {
            Err(AuthError::ClaimsFetch("Access token rejected".to_string()))
        }
    }

    fn controller(provider: Arc<FakeProvider>) -> AuthFlowController {
        AuthFlowController::new(
            provider,
            Arc::new(PendingFlowStore::new()),
            Arc::new(SessionStore::new()),
        )
    }

    fn callback(state: &str, code: &str) -> HashMap<String, String> {
        let mut params = HashMap::new();
        params.insert("state".to_string(), state.to_string());
        params.insert("code".to_string(), code.to_string());
        params
    }

    #[tokio::test]
    async fn test_full_login_creates_session() {
        let controller = controller(Arc::new(FakeProvider::new()));
        let target = controller
            .initiate_login(&["User.Read".to_string()], "http://localhost:8000/token")
            .await
            .unwrap();
        assert!(target.auth_uri.contains(&target.state));

        let session = controller
            .complete_login(&callback(&target.state, "valid-code"))
            .await
            .unwrap();
        assert_eq!(session.principal.username, "ada@example.com");
        assert!(session.principal.has_role("group-a"));
        assert_ne!(session.id, target.state);
    }

    #[tokio::test]
    async fn test_unknown_state_is_rejected() {
        let controller = controller(Arc::new(FakeProvider::new()));
        let err = controller
            .complete_login(&callback("never-issued", "valid-code"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidState));
    }

    #[tokio::test]
    async fn test_state_replay_is_rejected() {
        let controller = controller(Arc::new(FakeProvider::new()));
        let target = controller
            .initiate_login(&[], "http://localhost:8000/token")
            .await
            .unwrap();

        let params = callback(&target.state, "valid-code");
        assert!(controller.complete_login(&params).await.is_ok());
        let err = controller.complete_login(&params).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidState));
    }

    #[tokio::test]
    async fn test_concurrent_callbacks_have_one_winner() {
        let controller = Arc::new(controller(Arc::new(FakeProvider::new())));
        let target = controller
            .initiate_login(&[], "http://localhost:8000/token")
            .await
            .unwrap();

        let params = callback(&target.state, "valid-code");
        let a = {
            let controller = controller.clone();
            let params = params.clone();
            tokio::spawn(async move { controller.complete_login(&params).await })
        };
        let b = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.complete_login(&params).await })
        };

        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        assert!(a.is_ok() ^ b.is_ok());
        assert_eq!(controller.sessions().len().await, 1);
    }

    #[tokio::test]
    async fn test_failed_exchange_creates_no_session_and_consumes_state() {
        let provider = Arc::new(FakeProvider::new());
        provider.fail_exchange.store(true, Ordering::SeqCst);
        let controller = controller(provider.clone());
        let target = controller
            .initiate_login(&[], "http://localhost:8000/token")
            .await
            .unwrap();

        let params = callback(&target.state, "valid-code");
        let err = controller.complete_login(&params).await.unwrap_err();
        assert!(matches!(err, AuthError::ExchangeFailed(_)));
        assert!(controller.sessions().is_empty().await);

        // Retry with the same state: the flow was consumed by the failure.
        provider.fail_exchange.store(false, Ordering::SeqCst);
        let err = controller.complete_login(&params).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidState));
    }

    #[tokio::test]
    async fn test_resolve_session_refreshes_tokens() {
        let controller = controller(Arc::new(FakeProvider::new()));
        let target = controller
            .initiate_login(&[], "http://localhost:8000/token")
            .await
            .unwrap();
        let session = controller
            .complete_login(&callback(&target.state, "valid-code"))
            .await
            .unwrap();

        let resolved = controller.resolve_session(Some(&session.id)).await.unwrap();
        assert_eq!(resolved.tokens.access_token, "refreshed-access");
        assert_eq!(resolved.principal.username, "ada@example.com");
    }

    #[tokio::test]
    async fn test_resolve_session_without_cookie() {
        let controller = controller(Arc::new(FakeProvider::new()));
        assert!(controller.resolve_session(None).await.is_none());
        assert!(controller.resolve_session(Some("unknown")).await.is_none());
    }

    #[tokio::test]
    async fn test_silent_refresh_failure_signs_the_user_out() {
        let provider = Arc::new(FakeProvider::new());
        let controller = controller(provider.clone());
        let target = controller
            .initiate_login(&[], "http://localhost:8000/token")
            .await
            .unwrap();
        let session = controller
            .complete_login(&callback(&target.state, "valid-code"))
            .await
            .unwrap();

        provider.fail_silent.store(true, Ordering::SeqCst);
        assert!(controller.resolve_session(Some(&session.id)).await.is_none());
    }

    #[tokio::test]
    async fn test_logout_removes_session_and_is_idempotent() {
        let controller = controller(Arc::new(FakeProvider::new()));
        let target = controller
            .initiate_login(&[], "http://localhost:8000/token")
            .await
            .unwrap();
        let session = controller
            .complete_login(&callback(&target.state, "valid-code"))
            .await
            .unwrap();

        let url = controller.logout(&session.id, "http://localhost:8000/").await;
        assert!(url.contains("post_logout_redirect_uri"));
        assert!(controller.resolve_session(Some(&session.id)).await.is_none());

        // A second logout with the same id is harmless.
        let url = controller.logout(&session.id, "http://localhost:8000/").await;
        assert!(url.contains("logout"));
    }

    #[tokio::test]
    async fn test_directory_claims_enrich_the_principal() {
        let controller = controller(Arc::new(FakeProvider::new()))
            .with_claims_source(Arc::new(FakeClaimsSource));
        let target = controller
            .initiate_login(&[], "http://localhost:8000/token")
            .await
            .unwrap();
        let session = controller
            .complete_login(&callback(&target.state, "valid-code"))
            .await
            .unwrap();

        assert_eq!(
            session.principal.display_name.as_deref(),
            Some("Ada from the directory")
        );
        assert!(session.principal.has_role("EventHarnessAdmin"));
        assert!(session.principal.has_role("group-a"));
    }

    #[tokio::test]
    async fn test_directory_failure_fails_the_login() {
        let controller = controller(Arc::new(FakeProvider::new()))
            .with_claims_source(Arc::new(FailingClaimsSource));
        let target = controller
            .initiate_login(&[], "http://localhost:8000/token")
            .await
            .unwrap();

        let err = controller
            .complete_login(&callback(&target.state, "valid-code"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ClaimsFetch(_)));
        assert!(controller.sessions().is_empty().await);
    }
}
