//! Pending login flow store
//!
//! Holds authorization flows between the redirect to the provider and the
//! callback, keyed by `state`. Consumption is a single remove under the
//! write lock, so concurrent callbacks with the same state resolve to
//! exactly one winner.

use std::collections::HashMap;

use chrono::Duration;
use tokio::sync::RwLock;
use tracing::debug;

use crate::provider::AuthCodeFlow;

const DEFAULT_FLOW_TTL_MINUTES: i64 = 10;

/// Store of pending authorization flows, keyed by `state`.
#[derive(Debug)]
pub struct PendingFlowStore {
    flows: RwLock<HashMap<String, AuthCodeFlow>>,
    ttl: Duration,
}

impl PendingFlowStore {
    /// Create a store with the default flow time-to-live.
    pub fn new() -> Self {
        Self::with_ttl(Duration::minutes(DEFAULT_FLOW_TTL_MINUTES))
    }

    /// Create a store with a custom flow time-to-live.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            flows: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Register a pending flow under its state value.
    ///
    /// Expired flows are dropped on the way in, so abandoned logins do not
    /// accumulate.
    pub async fn insert(&self, flow: AuthCodeFlow) {
        let mut flows = self.flows.write().await;
        flows.retain(|_, pending| !pending.is_expired(self.ttl));
        flows.insert(flow.state.clone(), flow);
    }

    /// Remove and return the flow for a state value.
    ///
    /// Returns `None` for unknown, already-consumed, and expired states.
    /// The removal happens in one operation under the write lock, which is
    /// what guarantees a state is only ever redeemed once.
    pub async fn take(&self, state: &str) -> Option<AuthCodeFlow> {
        let removed = self.flows.write().await.remove(state);
        match removed {
            Some(flow) if flow.is_expired(self.ttl) => {
                debug!("Discarding expired login flow for state {}", flow.state);
                None
            }
            other => other,
        }
    }

    /// Number of pending flows, including any not yet pruned.
    pub async fn len(&self) -> usize {
        self.flows.read().await.len()
    }

    /// Whether no flows are pending.
    pub async fn is_empty(&self) -> bool {
        self.flows.read().await.is_empty()
    }
}

impl Default for PendingFlowStore {
    fn default() -> Self {
        Self::new()
    }
}
