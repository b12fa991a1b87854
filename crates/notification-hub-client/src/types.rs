//! Hub API types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// REST API version sent with every hub request.
pub const API_VERSION: &str = "2015-01";

/// Installation body for `PUT /{hub}/installations/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Installation {
    pub installation_id: String,
    pub platform: String,
    pub push_channel: String,
}

impl Installation {
    /// Installation for a GCM push channel.
    pub fn gcm(installation_id: impl Into<String>, push_channel: impl Into<String>) -> Self {
        Self {
            installation_id: installation_id.into(),
            platform: "gcm".into(),
            push_channel: push_channel.into(),
        }
    }
}

/// Result of registering a token with a hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubRegistration {
    pub registration_id: String,
    pub hub_path: String,
}

/// A native registration remembered for this device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NativeRegistration {
    /// Installation id assigned on the hub
    pub registration_id: String,

    /// Platform push token bound to the installation
    pub push_channel: String,

    /// Hub the registration lives in
    pub notification_hub_path: String,

    /// When the registration was last written
    pub registered_at: DateTime<Utc>,
}

impl NativeRegistration {
    pub fn new(
        registration_id: impl Into<String>,
        push_channel: impl Into<String>,
        notification_hub_path: impl Into<String>,
    ) -> Self {
        Self {
            registration_id: registration_id.into(),
            push_channel: push_channel.into(),
            notification_hub_path: notification_hub_path.into(),
            registered_at: Utc::now(),
        }
    }
}

/// Derive a stable installation id for a hub/token pair.
///
/// Re-registering the same token against the same hub yields the same id,
/// so the hub-side `PUT` is an idempotent upsert.
pub fn installation_id(hub_path: &str, push_channel: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(hub_path.as_bytes());
    hasher.update([0u8]);
    hasher.update(push_channel.as_bytes());
    hex::encode(hasher.finalize())[..32].to_string()
}
