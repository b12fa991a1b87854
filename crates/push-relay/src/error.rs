//! Error types for the push relay.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gcm_client::GcmError;
use notification_hub_client::HubError;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// The only issuer rejection code that signals a temporary condition.
const SERVICE_NOT_AVAILABLE: &str = "SERVICE_NOT_AVAILABLE";

/// Errors raised by a single call to the platform or hub transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Gcm(#[from] GcmError),

    #[error(transparent)]
    Hub(#[from] HubError),

    #[error("Call timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::Gcm(e) => match e {
                GcmError::Rejected(code) => code == SERVICE_NOT_AVAILABLE,
                GcmError::MissingSender
                | GcmError::MalformedResponse(_)
                | GcmError::Api { status: 400..=499, .. } => false,
                _ => true,
            },
            TransportError::Hub(e) => !matches!(
                e,
                HubError::InvalidConnectionString(_)
                    | HubError::Unauthorized
                    | HubError::HubNotFound(_)
                    | HubError::Signing(_)
                    | HubError::Api { status: 400..=499, .. }
            ),
            TransportError::Timeout(_) => true,
            TransportError::Other(_) => true,
        }
    }
}

/// Relay error types.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Unrecognized action: {0}")]
    UnrecognizedAction(String),

    #[error("{0}")]
    InvalidArgument(String),

    /// A remote call failed on its only (or only permitted) attempt.
    #[error("{0}")]
    Transport(#[from] TransportError),

    #[error("{operation} failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        last: TransportError,
    },

    #[error("Rate limit exceeded for {0}")]
    RateLimitExceeded(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            RelayError::UnrecognizedAction(_) => (StatusCode::BAD_REQUEST, "UNRECOGNIZED_ACTION"),
            RelayError::InvalidArgument(_) => (StatusCode::BAD_REQUEST, "INVALID_ARGUMENT"),
            RelayError::Transport(_) => (StatusCode::BAD_GATEWAY, "TRANSPORT_ERROR"),
            RelayError::RetriesExhausted { .. } => (StatusCode::BAD_GATEWAY, "RETRIES_EXHAUSTED"),
            RelayError::RateLimitExceeded(_) => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMIT_EXCEEDED"),
            RelayError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
