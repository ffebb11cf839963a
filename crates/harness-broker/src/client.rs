//! Broker client abstraction
//!
//! The trait producers and consumers talk to, plus the error and
//! statistics types shared by implementations.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::message::BrokerMessage;

/// Broker error types.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Topic does not exist
    #[error("Topic not found: {0}")]
    TopicNotFound(String),

    /// Subscription does not exist on the topic
    #[error("Subscription {subscription} not found on topic {topic}")]
    SubscriptionNotFound {
        /// The topic looked up
        topic: String,
        /// The missing subscription
        subscription: String,
    },

    /// Lock token does not match any in-flight message
    #[error("Lock token is invalid or expired: {0}")]
    InvalidLockToken(Uuid),

    /// Failed to send a message
    #[error("Failed to send message: {0}")]
    SendError(String),

    /// Connection to the broker failed
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Broker configuration is missing or malformed
    #[error("Broker configuration error: {0}")]
    Config(String),
}

/// Result type for broker operations.
pub type BrokerResult<T> = Result<T, BrokerError>;

/// A message handed out by a receive, with the lock token needed to
/// settle it.
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    /// The message
    pub message: BrokerMessage,
    /// Settlement token for complete/abandon
    pub lock_token: Uuid,
}

/// Broker statistics.
#[derive(Debug, Clone, Default)]
pub struct BrokerStats {
    /// Messages accepted onto topics
    pub messages_sent: u64,
    /// Messages completed by consumers
    pub messages_completed: u64,
    /// Messages abandoned back to their subscription
    pub messages_abandoned: u64,
}

/// Client interface to a topic/subscription message broker.
///
/// Receiving is peek-lock: a received message moves in flight and stays
/// invisible to other receivers until it is completed (removed for good)
/// or abandoned (returned to the subscription).
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Send a message to a topic. Returns the assigned sequence number.
    async fn send_to_topic(&self, topic: &str, message: BrokerMessage) -> BrokerResult<i64>;

    /// Look at pending messages without locking or removing them.
    async fn peek_subscription(
        &self,
        topic: &str,
        subscription: &str,
        max_count: usize,
    ) -> BrokerResult<Vec<BrokerMessage>>;

    /// Receive up to `max_count` messages, waiting up to `max_wait` for
    /// the first one. An empty result means nothing arrived in time.
    async fn receive_subscription(
        &self,
        topic: &str,
        subscription: &str,
        max_count: usize,
        max_wait: Duration,
    ) -> BrokerResult<Vec<ReceivedMessage>>;

    /// Settle an in-flight message as processed.
    async fn complete(
        &self,
        topic: &str,
        subscription: &str,
        lock_token: Uuid,
    ) -> BrokerResult<()>;

    /// Return an in-flight message to its subscription.
    async fn abandon(
        &self,
        topic: &str,
        subscription: &str,
        lock_token: Uuid,
    ) -> BrokerResult<()>;

    /// Get broker statistics.
    async fn stats(&self) -> BrokerStats;
}
