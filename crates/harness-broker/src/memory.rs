//! In-memory broker implementation
//!
//! A process-local broker with real topic/subscription semantics:
//! fan-out to every subscription, per-topic sequence numbers, peek-lock
//! receives, and bounded waiting. Suitable for single-process
//! deployments and testing; a remote broker implements the same trait.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::client::{BrokerClient, BrokerError, BrokerResult, BrokerStats, ReceivedMessage};
use crate::message::BrokerMessage;

use async_trait::async_trait;

const RECEIVE_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Default)]
struct SubscriptionQueue {
    available: VecDeque<BrokerMessage>,
    inflight: HashMap<Uuid, BrokerMessage>,
}

#[derive(Debug, Default)]
struct Topic {
    subscriptions: HashMap<String, SubscriptionQueue>,
    last_sequence: i64,
}

/// In-memory topic/subscription broker.
pub struct MemoryBroker {
    topics: RwLock<HashMap<String, Topic>>,
    stats: RwLock<BrokerStats>,
}

impl std::fmt::Debug for MemoryBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBroker").finish()
    }
}

impl MemoryBroker {
    /// Create a broker with no topics.
    pub fn new() -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            stats: RwLock::new(BrokerStats::default()),
        }
    }

    /// Add a topic. Sending to a topic that was never added fails.
    pub fn with_topic(mut self, name: impl Into<String>) -> Self {
        self.topics.get_mut().entry(name.into()).or_default();
        self
    }

    /// Add a subscription to a topic, creating the topic if needed.
    pub fn with_subscription(
        mut self,
        topic: impl Into<String>,
        subscription: impl Into<String>,
    ) -> Self {
        let topics = self.topics.get_mut();
        let topic = topics.entry(topic.into()).or_default();
        topic.subscriptions.entry(subscription.into()).or_default();
        self
    }

    /// Number of messages waiting on a subscription, not counting any
    /// in flight.
    pub async fn pending(&self, topic: &str, subscription: &str) -> BrokerResult<usize> {
        let topics = self.topics.read().await;
        let queue = subscription_queue(&topics, topic, subscription)?;
        Ok(queue.available.len())
    }

    async fn try_receive(
        &self,
        topic: &str,
        subscription: &str,
        max_count: usize,
    ) -> BrokerResult<Vec<ReceivedMessage>> {
        let mut topics = self.topics.write().await;
        let entry = topics
            .get_mut(topic)
            .ok_or_else(|| BrokerError::TopicNotFound(topic.to_string()))?;
        let queue = entry.subscriptions.get_mut(subscription).ok_or_else(|| {
            BrokerError::SubscriptionNotFound {
                topic: topic.to_string(),
                subscription: subscription.to_string(),
            }
        })?;

        let mut received = Vec::new();
        while received.len() < max_count {
            match queue.available.pop_front() {
                Some(message) => {
                    let lock_token = Uuid::now_v7();
                    queue.inflight.insert(lock_token, message.clone());
                    received.push(ReceivedMessage {
                        message,
                        lock_token,
                    });
                }
                None => break,
            }
        }
        Ok(received)
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

fn subscription_queue<'a>(
    topics: &'a HashMap<String, Topic>,
    topic: &str,
    subscription: &str,
) -> BrokerResult<&'a SubscriptionQueue> {
    let entry = topics
        .get(topic)
        .ok_or_else(|| BrokerError::TopicNotFound(topic.to_string()))?;
    entry
        .subscriptions
        .get(subscription)
        .ok_or_else(|| BrokerError::SubscriptionNotFound {
            topic: topic.to_string(),
            subscription: subscription.to_string(),
        })
}

#[async_trait]
impl BrokerClient for MemoryBroker {
    async fn send_to_topic(&self, topic: &str, message: BrokerMessage) -> BrokerResult<i64> {
        let sequence = {
            let mut topics = self.topics.write().await;
            let entry = topics
                .get_mut(topic)
                .ok_or_else(|| BrokerError::TopicNotFound(topic.to_string()))?;

            entry.last_sequence += 1;
            let mut message = message;
            message.sequence_number = entry.last_sequence;
            message.enqueued_at = Utc::now();

            for queue in entry.subscriptions.values_mut() {
                queue.available.push_back(message.clone());
            }
            entry.last_sequence
        };

        {
            let mut stats = self.stats.write().await;
            stats.messages_sent += 1;
        }

        debug!("Accepted message {} on topic {}", sequence, topic);
        Ok(sequence)
    }

    async fn peek_subscription(
        &self,
        topic: &str,
        subscription: &str,
        max_count: usize,
    ) -> BrokerResult<Vec<BrokerMessage>> {
        let topics = self.topics.read().await;
        let queue = subscription_queue(&topics, topic, subscription)?;
        Ok(queue.available.iter().take(max_count).cloned().collect())
    }

    async fn receive_subscription(
        &self,
        topic: &str,
        subscription: &str,
        max_count: usize,
        max_wait: Duration,
    ) -> BrokerResult<Vec<ReceivedMessage>> {
        let deadline = tokio::time::Instant::now() + max_wait;
        loop {
            let received = self.try_receive(topic, subscription, max_count).await?;
            if !received.is_empty() {
                return Ok(received);
            }
            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Ok(Vec::new());
            }
            tokio::time::sleep((deadline - now).min(RECEIVE_POLL_INTERVAL)).await;
        }
    }

    async fn complete(
        &self,
        topic: &str,
        subscription: &str,
        lock_token: Uuid,
    ) -> BrokerResult<()> {
        {
            let mut topics = self.topics.write().await;
            let entry = topics
                .get_mut(topic)
                .ok_or_else(|| BrokerError::TopicNotFound(topic.to_string()))?;
            let queue = entry.subscriptions.get_mut(subscription).ok_or_else(|| {
                BrokerError::SubscriptionNotFound {
                    topic: topic.to_string(),
                    subscription: subscription.to_string(),
                }
            })?;
            queue
                .inflight
                .remove(&lock_token)
                .ok_or(BrokerError::InvalidLockToken(lock_token))?;
        }

        let mut stats = self.stats.write().await;
        stats.messages_completed += 1;
        Ok(())
    }

    async fn abandon(
        &self,
        topic: &str,
        subscription: &str,
        lock_token: Uuid,
    ) -> BrokerResult<()> {
        {
            let mut topics = self.topics.write().await;
            let entry = topics
                .get_mut(topic)
                .ok_or_else(|| BrokerError::TopicNotFound(topic.to_string()))?;
            let queue = entry.subscriptions.get_mut(subscription).ok_or_else(|| {
                BrokerError::SubscriptionNotFound {
                    topic: topic.to_string(),
                    subscription: subscription.to_string(),
                }
            })?;
            let message = queue
                .inflight
                .remove(&lock_token)
                .ok_or(BrokerError::InvalidLockToken(lock_token))?;
            // Back to the front, so redelivery preserves order.
            queue.available.push_front(message);
        }

        let mut stats = self.stats.write().await;
        stats.messages_abandoned += 1;
        Ok(())
    }

    async fn stats(&self) -> BrokerStats {
        self.stats.read().await.clone()
    }
}
