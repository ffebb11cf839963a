//! Broker-to-patch-log relay
//!
//! Turns consumed broker messages into RDF patches. A message labelled
//! with the `rdf` subject carries triple data in its body; the relay
//! chains a new patch onto the datasource's log. Anything else passes
//! through untouched.

use tracing::{debug, instrument};
use uuid::Uuid;

use harness_broker::BrokerMessage;

use crate::delta::DeltaClient;
use crate::error::RdfResult;
use crate::patch::Patch;

/// Subject label marking a message body as triple data.
pub const RDF_SUBJECT: &str = "rdf";

/// What happened to a processed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// The message carried triples; a patch was appended to the log
    Applied {
        /// Id of the appended patch
        patch_id: Uuid,
        /// Sequence number of the source message
        sequence: i64,
    },
    /// The message did not carry the `rdf` subject and was passed over
    Skipped {
        /// Sequence number of the source message
        sequence: i64,
    },
}

/// Relays consumed messages into a patch log datasource.
#[derive(Debug, Clone)]
pub struct PatchRelay {
    delta: DeltaClient,
    datasource: String,
}

impl PatchRelay {
    /// Create a relay writing to the given datasource.
    pub fn new(delta: DeltaClient, datasource: impl Into<String>) -> Self {
        Self {
            delta,
            datasource: datasource.into(),
        }
    }

    /// The datasource this relay writes to.
    pub fn datasource(&self) -> &str {
        &self.datasource
    }

    /// Process one consumed message.
    ///
    /// The new patch names the log's current latest patch as its
    /// predecessor, keeping the chain intact. Errors leave the log
    /// untouched; the caller decides whether to settle the message.
    #[instrument(skip(self, message), fields(sequence = message.sequence_number))]
    pub async fn process(&self, message: &BrokerMessage) -> RdfResult<RelayOutcome> {
        if !message.has_subject(RDF_SUBJECT) {
            debug!("Skipping message without the {} subject", RDF_SUBJECT);
            return Ok(RelayOutcome::Skipped {
                sequence: message.sequence_number,
            });
        }

        let prev = self.delta.latest_patch_id(&self.datasource).await?;
        let mut patch = Patch::new(&message.body);
        if let Some(prev) = prev {
            patch = patch.with_prev(prev);
        }
        self.delta.append(&self.datasource, &patch).await?;
        debug!("Appended patch {} to {}", patch.id, self.datasource);

        Ok(RelayOutcome::Applied {
            patch_id: patch.id,
            sequence: message.sequence_number,
        })
    }
}
