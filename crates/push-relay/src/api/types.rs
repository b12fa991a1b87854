//! API request and response types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of an action invocation.
#[derive(Debug, Default, Deserialize)]
pub struct InvokeRequest {
    /// Positional arguments, in the host script's order
    #[serde(default)]
    pub args: Vec<Value>,
}

/// How far an accepted invocation got before the stream opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchStatus {
    Pending,
    Completed,
}

/// First event on every reply stream.
#[derive(Debug, Serialize, Deserialize)]
pub struct DispatchedEvent {
    pub action: String,
    pub status: DispatchStatus,
}

/// Response to an inbound delivery.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeliveryResponse {
    /// A consumer received the payload
    pub delivered: bool,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub consumer_attached: bool,
}
