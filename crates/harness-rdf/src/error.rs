//! Error types for RDF service clients

use thiserror::Error;

/// RDF service error types.
#[derive(Debug, Error)]
pub enum RdfError {
    /// SPARQL endpoint returned a non-success status
    #[error("SPARQL error ({0}): {1}")]
    Sparql(u16, String),

    /// Patch log server returned a non-success status
    #[error("Patch log error ({0}): {1}")]
    Delta(u16, String),

    /// Transport failure talking to an RDF service
    #[error("RDF service unreachable: {0}")]
    Transport(String),

    /// Response body could not be parsed
    #[error("Invalid RDF service response: {0}")]
    InvalidResponse(String),
}

impl RdfError {
    /// Returns the HTTP status code this error maps to.
    pub fn status_code(&self) -> u16 {
        match self {
            RdfError::Sparql(status, _) | RdfError::Delta(status, _) => *status,
            RdfError::Transport(_) => 502,
            RdfError::InvalidResponse(_) => 502,
        }
    }

    /// Returns a machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            RdfError::Sparql(_, _) => "SPARQL_ERROR",
            RdfError::Delta(_, _) => "PATCH_LOG_ERROR",
            RdfError::Transport(_) => "RDF_SERVICE_UNREACHABLE",
            RdfError::InvalidResponse(_) => "INVALID_RDF_RESPONSE",
        }
    }
}

/// Result type for RDF service operations.
pub type RdfResult<T> = Result<T, RdfError>;
