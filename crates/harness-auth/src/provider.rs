//! Identity provider client
//!
//! OAuth2 authorization-code plumbing: building the authorization redirect
//! (PKCE, state, nonce), exchanging callback codes for tokens, and silent
//! token acquisition for cached accounts via refresh tokens.

use std::borrow::Cow;
use std::collections::HashMap;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use oauth2::basic::{
    BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
    BasicTokenType,
};
use oauth2::{
    AuthType, AuthUrl, AuthorizationCode, Client as OAuth2Client, ClientId, ClientSecret,
    CsrfToken, ExtraTokenFields, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, RefreshToken,
    RequestTokenError, Scope, StandardRevocableToken, StandardTokenResponse, TokenResponse,
    TokenUrl,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::claims::{Account, IdTokenClaims, TokenBundle};
use crate::config::ProviderConfig;
use crate::error::{AuthError, AuthResult};

/// A pending authorization-code flow, keyed by its `state` value.
///
/// Holds everything needed to finish the exchange when the callback
/// arrives: the PKCE verifier, the nonce, and the redirect URI the code
/// was issued for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthCodeFlow {
    /// One-time state value identifying this flow
    pub state: String,
    /// Full provider authorization URI for the browser redirect
    pub auth_uri: String,
    /// PKCE code verifier matching the challenge embedded in `auth_uri`
    pub code_verifier: String,
    /// Nonce embedded in the authorization request
    pub nonce: String,
    /// Redirect URI the authorization code will be returned to
    pub redirect_uri: String,
    /// Scopes requested for the access token
    pub scopes: Vec<String>,
    /// When the flow was initiated
    pub created_at: DateTime<Utc>,
}

impl AuthCodeFlow {
    /// Whether the flow is older than the given time-to-live.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        Utc::now().signed_duration_since(self.created_at) > ttl
    }
}

/// Result of a successful authorization-code exchange.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    /// Cached account handle for later silent acquisition
    pub account: Account,
    /// Claims decoded from the returned id token
    pub claims: IdTokenClaims,
    /// The granted token material
    pub tokens: TokenBundle,
}

/// Interface to an OAuth2 identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Start an authorization-code flow for the given scopes.
    async fn initiate_auth_code_flow(
        &self,
        scopes: &[String],
        redirect_uri: &str,
    ) -> AuthResult<AuthCodeFlow>;

    /// Finish a pending flow using the provider callback parameters.
    async fn acquire_token_by_auth_code_flow(
        &self,
        flow: &AuthCodeFlow,
        params: &HashMap<String, String>,
    ) -> AuthResult<TokenGrant>;

    /// Acquire a token for a cached account without user interaction.
    ///
    /// Returns `None` when the account is unknown or the provider refused
    /// to refresh; the caller treats that as a signed-out user.
    async fn acquire_token_silent(&self, scopes: &[String], account: &Account)
        -> Option<TokenBundle>;

    /// List cached accounts, optionally filtered by username.
    async fn get_accounts(&self, username: Option<&str>) -> Vec<Account>;

    /// Provider logout URL with a post-logout redirect.
    fn logout_url(&self, post_logout_redirect: &str) -> String;
}

/// Token-endpoint fields beyond RFC 6749.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdTokenFields {
    /// Raw id token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    /// Opaque account identifier blob (base64 JSON with `uid`/`utid`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_info: Option<String>,
}

impl ExtraTokenFields for IdTokenFields {}

type AadTokenResponse = StandardTokenResponse<IdTokenFields, BasicTokenType>;

type AadClient = OAuth2Client<
    BasicErrorResponse,
    AadTokenResponse,
    BasicTokenType,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
>;

#[derive(Debug, Clone)]
struct CachedAccount {
    account: Account,
    tokens: TokenBundle,
}

/// Confidential OAuth2 client with an in-process account cache.
///
/// Accounts are cached by home account id after a successful code
/// exchange; [`acquire_token_silent`](IdentityProvider::acquire_token_silent)
/// serves from the cache and falls back to the refresh-token grant when
/// the access token is near expiry.
pub struct ConfidentialClient {
    config: ProviderConfig,
    oauth: AadClient,
    http: reqwest::Client,
    cache: RwLock<HashMap<String, CachedAccount>>,
}

impl std::fmt::Debug for ConfidentialClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfidentialClient")
            .field("client_id", &self.config.client_id)
            .field("tenant_id", &self.config.tenant_id)
            .finish()
    }
}

impl ConfidentialClient {
    /// Build a client from provider configuration.
    ///
    /// Fails fast on an unusable configuration so the process never serves
    /// logins it cannot complete.
    pub fn new(config: ProviderConfig) -> AuthResult<Self> {
        config.validate()?;

        let auth_url = AuthUrl::new(config.authorize_url())
            .map_err(|e| AuthError::ProviderConfig(format!("Invalid authorize endpoint: {}", e)))?;
        let token_url = TokenUrl::new(config.token_url())
            .map_err(|e| AuthError::ProviderConfig(format!("Invalid token endpoint: {}", e)))?;

        // The provider expects confidential-client credentials in the
        // request body, not in an Authorization header.
        let oauth = AadClient::new(
            ClientId::new(config.client_id.clone()),
            config.client_secret.clone().map(ClientSecret::new),
            auth_url,
            Some(token_url),
        )
        .set_auth_type(AuthType::RequestBody);

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AuthError::ProviderConfig(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            oauth,
            http,
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// The configuration this client was built from.
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn send_request(
        &self,
        request: oauth2::HttpRequest,
    ) -> Result<oauth2::HttpResponse, reqwest::Error> {
        let mut builder = self
            .http
            .request(request.method, request.url.as_str())
            .headers(request.headers);
        if !request.body.is_empty() {
            builder = builder.body(request.body);
        }
        let response = builder.send().await?;
        Ok(oauth2::HttpResponse {
            status_code: response.status(),
            headers: response.headers().clone(),
            body: response.bytes().await?.to_vec(),
        })
    }
}

#[async_trait]
impl IdentityProvider for ConfidentialClient {
    async fn initiate_auth_code_flow(
        &self,
        scopes: &[String],
        redirect_uri: &str,
    ) -> AuthResult<AuthCodeFlow> {
        let redirect = RedirectUrl::new(redirect_uri.to_string())
            .map_err(|e| AuthError::Provider(format!("Invalid redirect URI: {}", e)))?;

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let nonce = random_token(32);

        let mut request = self
            .oauth
            .authorize_url(CsrfToken::new_random)
            .set_redirect_uri(Cow::Owned(redirect))
            .set_pkce_challenge(pkce_challenge)
            .add_extra_param("nonce", nonce.as_str());
        for scope in scopes {
            request = request.add_scope(Scope::new(scope.clone()));
        }
        if let Some(ref mode) = self.config.response_mode {
            request = request.add_extra_param("response_mode", mode.as_str());
        }

        let (auth_uri, csrf) = request.url();
        debug!("Built authorization redirect for state {}", csrf.secret());

        Ok(AuthCodeFlow {
            state: csrf.secret().clone(),
            auth_uri: auth_uri.to_string(),
            code_verifier: pkce_verifier.secret().clone(),
            nonce,
            redirect_uri: redirect_uri.to_string(),
            scopes: scopes.to_vec(),
            created_at: Utc::now(),
        })
    }

    async fn acquire_token_by_auth_code_flow(
        &self,
        flow: &AuthCodeFlow,
        params: &HashMap<String, String>,
    ) -> AuthResult<TokenGrant> {
        if let Some(error) = params.get("error") {
            let description = params
                .get("error_description")
                .map(String::as_str)
                .unwrap_or("no description");
            return Err(AuthError::ExchangeFailed(format!(
                "{}: {}",
                error, description
            )));
        }
        match params.get("state") {
            Some(state) if state == &flow.state => {}
            _ => {
                return Err(AuthError::ExchangeFailed(
                    "State mismatch in callback".to_string(),
                ))
            }
        }
        let code = params.get("code").ok_or_else(|| {
            AuthError::ExchangeFailed("Callback missing authorization code".to_string())
        })?;

        let redirect = RedirectUrl::new(flow.redirect_uri.clone())
            .map_err(|e| AuthError::Provider(format!("Invalid redirect URI: {}", e)))?;

        let response = self
            .oauth
            .exchange_code(AuthorizationCode::new(code.clone()))
            .set_pkce_verifier(PkceCodeVerifier::new(flow.code_verifier.clone()))
            .set_redirect_uri(Cow::Owned(redirect))
            .add_extra_param("client_info", "1")
            .request_async(|req| self.send_request(req))
            .await
            .map_err(map_token_error)?;

        let claims = match response.extra_fields().id_token.as_deref() {
            Some(token) => IdTokenClaims::decode_unverified(token)?,
            None => IdTokenClaims::default(),
        };
        if let Some(ref nonce) = claims.nonce {
            if nonce != &flow.nonce {
                warn!("Nonce mismatch in id token for state {}", flow.state);
                return Err(AuthError::ExchangeFailed(
                    "Nonce mismatch in id token".to_string(),
                ));
            }
        }

        let account = account_from(&claims, response.extra_fields().client_info.as_deref());
        let tokens = bundle_from(&response, &flow.scopes);
        debug!("Exchanged authorization code for {}", account.username);

        let mut cache = self.cache.write().await;
        cache.insert(
            account.home_id.clone(),
            CachedAccount {
                account: account.clone(),
                tokens: tokens.clone(),
            },
        );

        Ok(TokenGrant {
            account,
            claims,
            tokens,
        })
    }

    async fn acquire_token_silent(
        &self,
        scopes: &[String],
        account: &Account,
    ) -> Option<TokenBundle> {
        let cached = {
            let cache = self.cache.read().await;
            cache.get(&account.home_id).cloned()
        }?;

        if !cached.tokens.expires_within(Duration::minutes(5)) {
            return Some(cached.tokens);
        }

        let refresh_token = match cached.tokens.refresh_token {
            Some(ref token) => RefreshToken::new(token.clone()),
            None => {
                debug!("No refresh token cached for {}", account.username);
                return None;
            }
        };

        let mut request = self.oauth.exchange_refresh_token(&refresh_token);
        for scope in scopes {
            request = request.add_scope(Scope::new(scope.clone()));
        }
        match request.request_async(|req| self.send_request(req)).await {
            Ok(response) => {
                let mut tokens = bundle_from(&response, scopes);
                // Providers may omit the refresh token on renewal.
                if tokens.refresh_token.is_none() {
                    tokens.refresh_token = cached.tokens.refresh_token.clone();
                }
                let mut cache = self.cache.write().await;
                cache.insert(
                    account.home_id.clone(),
                    CachedAccount {
                        account: account.clone(),
                        tokens: tokens.clone(),
                    },
                );
                Some(tokens)
            }
            Err(e) => {
                debug!("Silent acquisition failed for {}: {}", account.username, e);
                None
            }
        }
    }

    async fn get_accounts(&self, username: Option<&str>) -> Vec<Account> {
        let cache = self.cache.read().await;
        cache
            .values()
            .filter(|cached| username.map_or(true, |u| cached.account.username == u))
            .map(|cached| cached.account.clone())
            .collect()
    }

    fn logout_url(&self, post_logout_redirect: &str) -> String {
        match url::Url::parse(&self.config.logout_url()) {
            Ok(mut url) => {
                url.query_pairs_mut()
                    .append_pair("post_logout_redirect_uri", post_logout_redirect);
                url.to_string()
            }
            Err(_) => self.config.logout_url(),
        }
    }
}

fn map_token_error(err: RequestTokenError<reqwest::Error, BasicErrorResponse>) -> AuthError {
    match err {
        RequestTokenError::ServerResponse(response) => {
            AuthError::ExchangeFailed(response.to_string())
        }
        RequestTokenError::Request(e) => AuthError::Provider(format!("Token request failed: {}", e)),
        RequestTokenError::Parse(e, _) => {
            AuthError::ExchangeFailed(format!("Malformed token response: {}", e))
        }
        RequestTokenError::Other(message) => AuthError::ExchangeFailed(message),
    }
}

fn account_from(claims: &IdTokenClaims, client_info: Option<&str>) -> Account {
    let home_id = client_info
        .and_then(decode_client_info)
        .unwrap_or_else(|| match (&claims.oid, &claims.tid) {
            (Some(oid), Some(tid)) => format!("{}.{}", oid, tid),
            _ => claims.sub.clone(),
        });
    let username = claims
        .preferred_username
        .clone()
        .unwrap_or_else(|| claims.sub.clone());
    Account { home_id, username }
}

fn bundle_from(response: &AadTokenResponse, scopes: &[String]) -> TokenBundle {
    let expires_in = response
        .expires_in()
        .unwrap_or(std::time::Duration::from_secs(3600));
    TokenBundle {
        access_token: response.access_token().secret().clone(),
        token_type: "Bearer".to_string(),
        refresh_token: response.refresh_token().map(|t| t.secret().clone()),
        id_token: response.extra_fields().id_token.clone(),
        scopes: scopes.to_vec(),
        expires_at: Utc::now()
            + Duration::from_std(expires_in).unwrap_or_else(|_| Duration::seconds(3600)),
    }
}

#[derive(Debug, Deserialize)]
struct ClientInfo {
    uid: String,
    utid: String,
}

/// `client_info` is a base64url JSON blob carrying `uid` and `utid`.
fn decode_client_info(blob: &str) -> Option<String> {
    let decoded = URL_SAFE_NO_PAD.decode(blob.trim_end_matches('=')).ok()?;
    let info: ClientInfo = serde_json::from_slice(&decoded).ok()?;
    Some(format!("{}.{}", info.uid, info.utid))
}

pub(crate) fn random_token(length: usize) -> String {
    use rand::Rng;
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_client_info() {
        let blob = URL_SAFE_NO_PAD.encode(r#"{"uid":"user-1","utid":"tenant-1"}"#);
        assert_eq!(
            decode_client_info(&blob).as_deref(),
            Some("user-1.tenant-1")
        );
    }

    #[test]
    fn test_decode_client_info_rejects_garbage() {
        assert!(decode_client_info("###").is_none());
        let blob = URL_SAFE_NO_PAD.encode(r#"{"unrelated":true}"#);
        assert!(decode_client_info(&blob).is_none());
    }

    #[test]
    fn test_account_prefers_client_info() {
        let claims = IdTokenClaims {
            sub: "subject".to_string(),
            oid: Some("oid".to_string()),
            tid: Some("tid".to_string()),
            preferred_username: Some("ada@example.com".to_string()),
            ..Default::default()
        };
        let blob = URL_SAFE_NO_PAD.encode(r#"{"uid":"u","utid":"t"}"#);
        let account = account_from(&claims, Some(&blob));
        assert_eq!(account.home_id, "u.t");
        assert_eq!(account.username, "ada@example.com");
    }

    #[test]
    fn test_account_falls_back_to_claims() {
        let claims = IdTokenClaims {
            sub: "subject".to_string(),
            oid: Some("oid".to_string()),
            tid: Some("tid".to_string()),
            ..Default::default()
        };
        assert_eq!(account_from(&claims, None).home_id, "oid.tid");

        let bare = IdTokenClaims {
            sub: "subject".to_string(),
            ..Default::default()
        };
        let account = account_from(&bare, None);
        assert_eq!(account.home_id, "subject");
        assert_eq!(account.username, "subject");
    }

    #[test]
    fn test_flow_expiry() {
        let flow = AuthCodeFlow {
            state: "s".to_string(),
            auth_uri: String::new(),
            code_verifier: String::new(),
            nonce: String::new(),
            redirect_uri: String::new(),
            scopes: vec![],
            created_at: Utc::now() - Duration::minutes(11),
        };
        assert!(flow.is_expired(Duration::minutes(10)));
        assert!(!flow.is_expired(Duration::minutes(15)));
    }

    #[test]
    fn test_logout_url_encodes_redirect() {
        let config = ProviderConfig::new("app", None, "tenant");
        let client = ConfidentialClient::new(config).unwrap();
        let url = client.logout_url("http://localhost:8000/");
        assert!(url.starts_with(
            "https://login.microsoftonline.com/tenant/oauth2/v2.0/logout?post_logout_redirect_uri="
        ));
        assert!(url.contains("http%3A%2F%2Flocalhost%3A8000%2F"));
    }

    #[test]
    fn test_random_token_is_alphanumeric() {
        let token = random_token(32);
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
