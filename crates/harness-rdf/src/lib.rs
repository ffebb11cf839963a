//! # Harness RDF
//!
//! Clients for the RDF side of the event harness: SPARQL query/update
//! endpoints, the RDF Delta patch log, and the relay that turns consumed
//! broker messages into patches.
//!
//! ## Overview
//!
//! - **SPARQL**: [`SparqlClient`] runs SELECT queries (JSON or CSV) and
//!   updates against an endpoint pair.
//! - **Patch log**: [`DeltaClient`] reads datasource and log metadata
//!   and appends [`Patch`] documents.
//! - **Relay**: [`PatchRelay`] inspects consumed messages and appends a
//!   patch for each body labelled with the `rdf` subject.
//!
//! ## Usage
//!
//! ```rust
//! use harness_rdf::Patch;
//!
//! let patch = Patch::new("<http://e.com/a> <http://e.com/b> \"c\" .")
//!     .with_prev("0190aabb-ccdd-7123-8000-000000000001");
//!
//! let rendered = patch.to_string();
//! assert!(rendered.contains("H prev <uuid:0190aabb-ccdd-7123-8000-000000000001> ."));
//! assert!(rendered.contains("A <http://e.com/a> <http://e.com/b> \"c\" ."));
//! ```

pub mod delta;
pub mod error;
pub mod patch;
pub mod relay;
pub mod sparql;

pub use delta::{DataSourceDescription, DeltaClient, LogDescription};
pub use error::{RdfError, RdfResult};
pub use patch::Patch;
pub use relay::{PatchRelay, RelayOutcome, RDF_SUBJECT};
pub use sparql::{SparqlClient, SparqlResults, SparqlTerm};
