//! # Harness Broker
//!
//! Topic/subscription messaging for the event harness. Producers send
//! messages to a topic; the broker fans each message out to every
//! subscription, where consumers receive under a peek-lock and settle
//! with complete or abandon.
//!
//! ## Overview
//!
//! - **Messages**: [`BrokerMessage`] carries a body, an optional subject
//!   label used for routing, and the sequence number the broker assigns.
//! - **Client trait**: [`BrokerClient`] is what producers and consumers
//!   program against.
//! - **In-memory broker**: [`MemoryBroker`] implements the full
//!   semantics in process.
//! - **Settings**: [`BrokerSettings`] names the topic, subscription, and
//!   authentication method for a deployment.
//!
//! ## Usage
//!
//! ```rust
//! use std::time::Duration;
//! use harness_broker::{BrokerClient, BrokerMessage, MemoryBroker};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), harness_broker::BrokerError> {
//! let broker = MemoryBroker::new().with_subscription("events", "workers");
//!
//! let sequence = broker
//!     .send_to_topic("events", BrokerMessage::new("<a> <b> <c> .").with_subject("rdf"))
//!     .await?;
//! assert_eq!(sequence, 1);
//!
//! let received = broker
//!     .receive_subscription("events", "workers", 1, Duration::ZERO)
//!     .await?;
//! broker.complete("events", "workers", received[0].lock_token).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod memory;
pub mod message;

pub use client::{BrokerClient, BrokerError, BrokerResult, BrokerStats, ReceivedMessage};
pub use config::{BrokerAuth, BrokerSettings};
pub use memory::MemoryBroker;
pub use message::BrokerMessage;
