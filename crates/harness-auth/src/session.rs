//! Sessions and the session store
//!
//! A session binds a browser cookie to an authenticated principal and its
//! token material. Identity is fixed at login; silent refresh only ever
//! replaces the token bundle.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::claims::{Account, Principal, TokenBundle};
use crate::provider::random_token;

const DEFAULT_SESSION_TTL_HOURS: i64 = 12;
const SESSION_ID_LENGTH: usize = 32;

/// An authenticated session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Opaque session identifier, also the cookie value
    pub id: String,
    /// The authenticated principal
    pub principal: Principal,
    /// Provider account handle used for silent token acquisition
    pub account: Account,
    /// Current token material
    pub tokens: TokenBundle,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// When tokens were last refreshed
    pub last_refreshed_at: DateTime<Utc>,
}

impl Session {
    /// Create a session with a freshly generated id.
    ///
    /// The id is independent of any flow state value, so nothing observed
    /// during the login redirect names a live session.
    pub fn new(principal: Principal, account: Account, tokens: TokenBundle) -> Self {
        let now = Utc::now();
        Self {
            id: random_token(SESSION_ID_LENGTH),
            principal,
            account,
            tokens,
            created_at: now,
            last_refreshed_at: now,
        }
    }

    /// Whether the session is past the given lifetime.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        Utc::now().signed_duration_since(self.created_at) > ttl
    }
}

/// Store of active sessions, keyed by session id.
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
}

impl SessionStore {
    /// Create a store with the default session lifetime.
    pub fn new() -> Self {
        Self::with_ttl(Duration::hours(DEFAULT_SESSION_TTL_HOURS))
    }

    /// Create a store with a custom session lifetime.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Add a session, pruning expired entries on the way in.
    pub async fn insert(&self, session: Session) {
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, existing| !existing.is_expired(self.ttl));
        sessions.insert(session.id.clone(), session);
    }

    /// Look up a session by id. Expired entries are evicted and reported
    /// as absent.
    pub async fn get(&self, id: &str) -> Option<Session> {
        {
            let sessions = self.sessions.read().await;
            match sessions.get(id) {
                Some(session) if !session.is_expired(self.ttl) => return Some(session.clone()),
                None => return None,
                Some(_) => {}
            }
        }

        let mut sessions = self.sessions.write().await;
        match sessions.get(id) {
            Some(session) if session.is_expired(self.ttl) => {
                debug!("Evicting expired session {}", id);
                sessions.remove(id);
                None
            }
            Some(session) => Some(session.clone()),
            None => None,
        }
    }

    /// Replace a session's token bundle, leaving identity untouched.
    pub async fn update_tokens(&self, id: &str, tokens: TokenBundle) -> Option<Session> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(id)?;
        session.tokens = tokens;
        session.last_refreshed_at = Utc::now();
        Some(session.clone())
    }

    /// Remove a session. Removing an absent id is not an error.
    pub async fn remove(&self, id: &str) -> Option<Session> {
        self.sessions.write().await.remove(id)
    }

    /// Number of stored sessions, including any not yet pruned.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no sessions are stored.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    fn session() -> Session {
        Session::new(
            Principal::new("user-1", "ada@example.com"),
            Account {
                home_id: "u.t".to_string(),
                username: "ada@example.com".to_string(),
            },
            bundle(),
        )
    }

    #[test]
    fn test_session_ids_are_unique() {
        let a = session();
        let b = session();
        assert_ne!(a.id, b.id);
        assert_eq!(a.id.len(), SESSION_ID_LENGTH);
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = SessionStore::new();
        let session = session();
        let id = session.id.clone();
        store.insert(session).await;

        let found = store.get(&id).await.unwrap();
        assert_eq!(found.principal.username, "ada@example.com");
    }

    #[tokio::test]
    async fn test_expired_session_is_evicted() {
        let store = SessionStore::with_ttl(Duration::hours(12));
        let mut stale = session();
        stale.created_at = Utc::now() - Duration::hours(13);
        let id = stale.id.clone();
        store.insert(stale).await;

        assert!(store.get(&id).await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_update_tokens_preserves_identity() {
        let store = SessionStore::new();
        let session = session();
        let id = session.id.clone();
        let created_at = session.created_at;
        store.insert(session).await;

        let mut renewed = bundle();
        renewed.access_token = "renewed-access".to_string();
        let updated = store.update_tokens(&id, renewed).await.unwrap();

        assert_eq!(updated.tokens.access_token, "renewed-access");
        assert_eq!(updated.principal.username, "ada@example.com");
        assert_eq!(updated.created_at, created_at);
        assert!(updated.last_refreshed_at >= created_at);
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let store = SessionStore::new();
        let session = session();
        let id = session.id.clone();
        store.insert(session).await;

        assert!(store.remove(&id).await.is_some());
        assert!(store.remove(&id).await.is_none());
    }
}
