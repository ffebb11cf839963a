//! Web-layer error mapping
//!
//! Wraps the harness crate errors and turns them into HTTP responses.
//! Denied authorization is a normal outcome here, not a fault: it maps to
//! a structured 401 body and nothing is logged above debug.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use harness_auth::AuthError;
use harness_broker::BrokerError;
use harness_rdf::RdfError;

/// Error type for route handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No session, or the gate denied the principal
    #[error("Unauthorized access")]
    Unauthorized,

    /// Login flow failure surfaced to the caller
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Broker operation failure
    #[error(transparent)]
    Broker(#[from] BrokerError),

    /// SPARQL or patch log failure
    #[error(transparent)]
    Rdf(#[from] RdfError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "Unauthorized access"})),
            )
                .into_response(),
            ApiError::Auth(err) => {
                let status = StatusCode::from_u16(err.status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                let body = json!({"error": err.error_code(), "message": err.to_string()});
                (status, Json(body)).into_response()
            }
            ApiError::Broker(err) => {
                let body = json!({"error": "BROKER_ERROR", "message": err.to_string()});
                (broker_status(&err), Json(body)).into_response()
            }
            ApiError::Rdf(err) => {
                let status = StatusCode::from_u16(err.status_code())
                    .unwrap_or(StatusCode::BAD_GATEWAY);
                let body = json!({"error": err.error_code(), "message": err.to_string()});
                (status, Json(body)).into_response()
            }
        }
    }
}

fn broker_status(err: &BrokerError) -> StatusCode {
    match err {
        BrokerError::TopicNotFound(_) | BrokerError::SubscriptionNotFound { .. } => {
            StatusCode::NOT_FOUND
        }
        BrokerError::InvalidLockToken(_) => StatusCode::CONFLICT,
        BrokerError::SendError(_) | BrokerError::ConnectionError(_) => StatusCode::BAD_GATEWAY,
        BrokerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
