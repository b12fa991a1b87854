//! GCM client errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GcmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The issuer answered with an `Error=<CODE>` body.
    #[error("Registration rejected: {0}")]
    Rejected(String),

    #[error("Malformed issuer response: {0}")]
    MalformedResponse(String),

    #[error("Sender id must not be empty")]
    MissingSender,
}
