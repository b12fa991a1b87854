//! Notification relay: forwards inbound pushes to the current consumer.

use crate::channel::{ChannelRegistry, PluginResult};
use crate::types::NotificationPayload;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct NotificationRelay {
    channels: Arc<ChannelRegistry>,
}

impl NotificationRelay {
    pub fn new(channels: Arc<ChannelRegistry>) -> Self {
        Self { channels }
    }

    /// Forward `payload` to the current channel, keeping it open.
    ///
    /// With no consumer attached the payload is dropped. Nothing is queued
    /// or retried. Returns whether a consumer received it.
    pub fn on_delivery(&self, payload: NotificationPayload) -> bool {
        let keys = payload.len();
        let delivered = self.channels.deliver(PluginResult::notification(payload));

        if delivered {
            debug!(keys, "Notification relayed");
        } else {
            debug!(keys, "Notification dropped, no consumer attached");
        }

        delivered
    }

    /// Sanitize a raw transport delivery and forward it.
    pub fn on_extras(&self, extras: Map<String, Value>) -> bool {
        self.on_delivery(NotificationPayload::from_extras(extras))
    }

    /// Forward a raw JSON body. Anything other than an object is logged and
    /// discarded.
    pub fn on_raw_delivery(&self, body: Value) -> bool {
        match NotificationPayload::from_value(body) {
            Some(payload) => self.on_delivery(payload),
            None => {
                warn!("Discarding inbound delivery that is not a JSON object");
                false
            }
        }
    }

    /// Relay every delivery from `deliveries`, in order, until it ends.
    pub async fn run<S>(self, deliveries: S)
    where
        S: Stream<Item = Map<String, Value>>,
    {
        info!("Notification relay started");

        tokio::pin!(deliveries);
        while let Some(extras) = deliveries.next().await {
            self.on_extras(extras);
        }

        info!("Inbound delivery stream ended");
    }
}
