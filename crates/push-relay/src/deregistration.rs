//! Deregistration handler.

use crate::channel::{ChannelRegistry, PluginResult};
use crate::error::RelayError;
use crate::retry::CallPolicy;
use crate::transport::HubTransport;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Revokes this device's hub registration.
///
/// Runs inline on the invoking task; the outcome is delivered before the
/// invocation returns.
#[derive(Clone)]
pub struct DeregistrationHandler {
    hub: Arc<dyn HubTransport>,
    channels: Arc<ChannelRegistry>,
    policy: CallPolicy,
}

impl DeregistrationHandler {
    pub fn new(hub: Arc<dyn HubTransport>, channels: Arc<ChannelRegistry>, policy: CallPolicy) -> Self {
        Self {
            hub,
            channels,
            policy,
        }
    }

    /// Revoke the registration tied to `hub_identifier` and the credential.
    /// Which registration that is remains the hub transport's decision.
    pub async fn unregister(
        &self,
        hub_identifier: &str,
        connection_credential: &str,
    ) -> Result<(), RelayError> {
        self.policy
            .run("hub revocation", || {
                self.hub.revoke(hub_identifier, connection_credential)
            })
            .await
    }

    /// Unregister and deliver an acknowledgement or error on the current
    /// channel. Returns whether the outcome reached a consumer.
    #[instrument(skip(self, connection_credential))]
    pub async fn handle(&self, hub_identifier: &str, connection_credential: &str) -> bool {
        let result = match self.unregister(hub_identifier, connection_credential).await {
            Ok(()) => {
                info!("Device unregistered");
                PluginResult::ack()
            }
            Err(e) => {
                warn!("Unregister failed: {}", e);
                PluginResult::error(e.to_string())
            }
        };

        self.channels.deliver(result)
    }
}
