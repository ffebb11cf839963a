//! Broker message envelope
//!
//! The message shape shared by producers and consumers. A message is
//! addressed to a topic; the broker fans it out to every subscription on
//! that topic and stamps it with a per-topic sequence number.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A message carried through the broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerMessage {
    /// Unique message id
    pub message_id: Uuid,

    /// Subject label, used by consumers to route the payload
    /// (e.g. `rdf` for triples destined for the patch log)
    pub subject: Option<String>,

    /// Message body
    pub body: String,

    /// Content type of the body
    pub content_type: Option<String>,

    /// Application properties
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,

    /// When the broker accepted the message
    pub enqueued_at: DateTime<Utc>,

    /// Per-topic sequence number, assigned by the broker on send
    pub sequence_number: i64,
}

impl BrokerMessage {
    /// Create a message with the given body.
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            message_id: Uuid::now_v7(),
            subject: None,
            body: body.into(),
            content_type: None,
            properties: HashMap::new(),
            enqueued_at: Utc::now(),
            sequence_number: 0,
        }
    }

    /// Set the subject label.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Add an application property.
    pub fn with_property(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// Whether the message carries the given subject label.
    pub fn has_subject(&self, subject: &str) -> bool {
        self.subject.as_deref() == Some(subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_message_defaults() {
        let message = BrokerMessage::new("hello");
        assert_eq!(message.body, "hello");
        assert!(message.subject.is_none());
        assert_eq!(message.sequence_number, 0);
    }

    #[test]
    fn test_builder_methods() {
        let message = BrokerMessage::new("<a> <b> <c> .")
            .with_subject("rdf")
            .with_content_type("text/plain")
            .with_property("origin", serde_json::json!("producer-1"));

        assert!(message.has_subject("rdf"));
        assert!(!message.has_subject("other"));
        assert_eq!(message.content_type.as_deref(), Some("text/plain"));
        assert_eq!(
            message.properties.get("origin"),
            Some(&serde_json::json!("producer-1"))
        );
    }

    #[test]
    fn test_message_ids_are_unique() {
        assert_ne!(
            BrokerMessage::new("a").message_id,
            BrokerMessage::new("b").message_id
        );
    }
}
