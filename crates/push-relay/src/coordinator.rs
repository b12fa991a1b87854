//! Registration coordinator.
//!
//! Obtains a platform token, registers it with the hub, and publishes the
//! outcome through the channel registry. The invocation that asked for the
//! registration returns as soon as the work is spawned.

use crate::channel::{CallbackChannel, ChannelRegistry, PluginResult};
use crate::error::RelayError;
use crate::retry::CallPolicy;
use crate::transport::{HubTransport, PlatformTransport};
use crate::types::{RegistrationRecord, RegistrationRequest};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};

#[derive(Clone)]
pub struct RegistrationCoordinator {
    platform: Arc<dyn PlatformTransport>,
    hub: Arc<dyn HubTransport>,
    channels: Arc<ChannelRegistry>,
    policy: CallPolicy,
}

impl RegistrationCoordinator {
    pub fn new(
        platform: Arc<dyn PlatformTransport>,
        hub: Arc<dyn HubTransport>,
        channels: Arc<ChannelRegistry>,
        policy: CallPolicy,
    ) -> Self {
        Self {
            platform,
            hub,
            channels,
            policy,
        }
    }

    /// Run both remote calls in order. The hub is only contacted once a
    /// token has been issued.
    pub async fn register(
        &self,
        request: &RegistrationRequest,
    ) -> Result<RegistrationRecord, RelayError> {
        let token = self
            .policy
            .run("token issuance", || {
                self.platform.issue_token(&request.sender_identifier)
            })
            .await?;

        debug!("Push token issued, registering with hub");

        let registration = self
            .policy
            .run("hub registration", || {
                self.hub.register_token(
                    &request.hub_identifier,
                    &request.connection_credential,
                    &token,
                )
            })
            .await?;

        Ok(RegistrationRecord {
            registration_id: registration.registration_id,
            channel_uri: token,
            notification_hub_path: registration.hub_path,
        })
    }

    /// Spawn the registration in the background.
    ///
    /// The result goes to whichever channel the registry holds when the work
    /// finishes. If `origin`'s consumer detaches first, the work is dropped.
    pub fn dispatch(&self, request: RegistrationRequest, origin: CallbackChannel) -> JoinHandle<()> {
        let this = self.clone();
        let span = info_span!("register", hub = %request.hub_identifier);

        tokio::spawn(
            async move {
                tokio::select! {
                    _ = origin.detached() => {
                        info!("Consumer detached, registration abandoned");
                    }
                    result = this.register(&request) => this.publish(result),
                }
            }
            .instrument(span),
        )
    }

    fn publish(&self, result: Result<RegistrationRecord, RelayError>) {
        let delivered = match result {
            Ok(record) => {
                info!(registration_id = %record.registration_id, "Device registered");
                self.channels.deliver(PluginResult::registered(&record))
            }
            Err(e) => {
                warn!("Registration failed: {}", e);
                self.channels.deliver(PluginResult::error(e.to_string()))
            }
        };

        if !delivered {
            debug!("Registration outcome dropped, no consumer attached");
        }
    }
}
