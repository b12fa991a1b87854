//! Seams to the two remote services the relay depends on.

use crate::error::TransportError;
use async_trait::async_trait;
use gcm_client::GcmClient;
use notification_hub_client::NotificationHubClient;

pub use notification_hub_client::HubRegistration;

/// Platform push transport: issues device tokens.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlatformTransport: Send + Sync {
    /// Obtain a push token for `sender_identifier`.
    async fn issue_token(&self, sender_identifier: &str) -> Result<String, TransportError>;
}

/// Notification hub transport: binds tokens to hub registrations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HubTransport: Send + Sync {
    /// Register `token` with the hub.
    async fn register_token(
        &self,
        hub_identifier: &str,
        connection_credential: &str,
        token: &str,
    ) -> Result<HubRegistration, TransportError>;

    /// Revoke this device's registration on the hub.
    async fn revoke(
        &self,
        hub_identifier: &str,
        connection_credential: &str,
    ) -> Result<(), TransportError>;
}

#[async_trait]
impl PlatformTransport for GcmClient {
    async fn issue_token(&self, sender_identifier: &str) -> Result<String, TransportError> {
        Ok(GcmClient::issue_token(self, sender_identifier).await?)
    }
}

#[async_trait]
impl HubTransport for NotificationHubClient {
    async fn register_token(
        &self,
        hub_identifier: &str,
        connection_credential: &str,
        token: &str,
    ) -> Result<HubRegistration, TransportError> {
        Ok(
            NotificationHubClient::register_token(self, hub_identifier, connection_credential, token)
                .await?,
        )
    }

    async fn revoke(
        &self,
        hub_identifier: &str,
        connection_credential: &str,
    ) -> Result<(), TransportError> {
        Ok(NotificationHubClient::revoke(self, hub_identifier, connection_credential).await?)
    }
}
