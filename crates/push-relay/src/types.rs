//! Relay data model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Operation tag carried by registration results.
pub const REGISTER_EVENT: &str = "registerApplication";

/// A request to register this device with a hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRequest {
    pub hub_identifier: String,
    pub connection_credential: String,
    pub sender_identifier: String,
}

/// Outcome of a successful registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRecord {
    /// Id the hub assigned to this device's registration
    pub registration_id: String,

    /// Platform push token the hub delivers to
    pub channel_uri: String,

    /// Hub the registration lives in
    pub notification_hub_path: String,
}

impl RegistrationRecord {
    /// JSON value delivered to consumers, tagged with the operation name.
    pub fn to_event_value(&self) -> Value {
        let mut value = Map::new();
        value.insert("registrationId".into(), self.registration_id.clone().into());
        value.insert("channelUri".into(), self.channel_uri.clone().into());
        value.insert(
            "notificationHubPath".into(),
            self.notification_hub_path.clone().into(),
        );
        value.insert("event".into(), REGISTER_EVENT.into());
        Value::Object(value)
    }
}

/// Inbound push payload: string keys mapped to scalar values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationPayload(Map<String, Value>);

impl NotificationPayload {
    /// Build a payload from raw transport extras.
    ///
    /// Entries whose values are not scalars (objects, arrays) are dropped one
    /// by one; the rest of the payload is kept.
    pub fn from_extras(extras: Map<String, Value>) -> Self {
        let mut payload = Map::with_capacity(extras.len());

        for (key, value) in extras {
            if is_scalar(&value) {
                payload.insert(key, value);
            } else {
                debug!(key = %key, "Dropping non-scalar payload entry");
            }
        }

        Self(payload)
    }

    /// Build a payload from an arbitrary JSON value. Only objects qualify.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(extras) => Some(Self::from_extras(extras)),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Object(_) | Value::Array(_))
}
