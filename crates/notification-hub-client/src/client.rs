//! Notification hub HTTP client.

use crate::connection::ConnectionString;
use crate::error::HubError;
use crate::store::{Registrations, Store};
use crate::types::*;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

/// Default lifetime of a SAS token.
const DEFAULT_SAS_TTL: Duration = Duration::from_secs(60 * 60);

/// Notification hub client.
///
/// Registers platform push tokens as hub installations and remembers, per
/// namespace and hub, which installation this device owns.
pub struct NotificationHubClient {
    client: Client,
    store: Store,
    registrations: RwLock<Registrations>,
    sas_ttl: Duration,
}

impl NotificationHubClient {
    /// Create a client with in-memory registration tracking.
    pub fn new(timeout: Duration) -> Result<Self, HubError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            store: Store::memory(),
            registrations: RwLock::new(Registrations::new()),
            sas_ttl: DEFAULT_SAS_TTL,
        })
    }

    /// Create a client backed by `store`, loading what it already holds.
    pub async fn open(timeout: Duration, store: Store) -> Result<Self, HubError> {
        let client = Client::builder().timeout(timeout).build()?;
        let registrations = store.load().await?;

        Ok(Self {
            client,
            store,
            registrations: RwLock::new(registrations),
            sas_ttl: DEFAULT_SAS_TTL,
        })
    }

    /// Override the SAS token lifetime.
    pub fn with_sas_ttl(mut self, ttl: Duration) -> Self {
        self.sas_ttl = ttl;
        self
    }

    /// The registration this device holds on `hub_path`, if any.
    pub async fn local_registration(
        &self,
        connection_string: &str,
        hub_path: &str,
    ) -> Result<Option<NativeRegistration>, HubError> {
        let conn: ConnectionString = connection_string.parse()?;
        let registrations = self.registrations.read().await;
        Ok(registrations.get(conn.endpoint(), hub_path).cloned())
    }

    /// Register `push_channel` with the hub as a GCM installation.
    #[instrument(skip(self, connection_string, push_channel))]
    pub async fn register_token(
        &self,
        hub_path: &str,
        connection_string: &str,
        push_channel: &str,
    ) -> Result<HubRegistration, HubError> {
        let conn: ConnectionString = connection_string.parse()?;
        let id = installation_id(hub_path, push_channel);
        let url = self.installation_url(&conn, hub_path, &id);

        debug!(url = %url, "Upserting installation");

        let response = self
            .client
            .put(&url)
            .header("Authorization", self.authorization(&conn, hub_path)?)
            .header("x-ms-version", API_VERSION)
            .json(&Installation::gcm(&id, push_channel))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.extract_error(response, hub_path).await);
        }

        {
            let mut registrations = self.registrations.write().await;
            registrations.insert(
                conn.endpoint(),
                NativeRegistration::new(&id, push_channel, hub_path),
            );
            self.persist(&registrations).await;
        }

        info!(registration_id = %id, "Native registration stored");

        Ok(HubRegistration {
            registration_id: id,
            hub_path: hub_path.to_string(),
        })
    }

    /// Delete this device's installation on `hub_path`.
    ///
    /// With no local registration there is nothing to revoke and the call
    /// succeeds. A hub-side 404 also counts as revoked. The registration
    /// map stays locked from lookup to removal, so a registration landing
    /// meanwhile is never dropped locally.
    #[instrument(skip(self, connection_string))]
    pub async fn revoke(&self, hub_path: &str, connection_string: &str) -> Result<(), HubError> {
        let conn: ConnectionString = connection_string.parse()?;

        let mut registrations = self.registrations.write().await;
        let existing = registrations.get(conn.endpoint(), hub_path).cloned();

        let Some(existing) = existing else {
            debug!("No local registration, nothing to revoke");
            return Ok(());
        };

        let url = self.installation_url(&conn, hub_path, &existing.registration_id);
        debug!(url = %url, "Deleting installation");

        let response = self
            .client
            .delete(&url)
            .header("Authorization", self.authorization(&conn, hub_path)?)
            .header("x-ms-version", API_VERSION)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            warn!(registration_id = %existing.registration_id, "Installation already gone on hub");
        } else if !status.is_success() {
            return Err(self.extract_error(response, hub_path).await);
        }

        registrations.remove(conn.endpoint(), hub_path);
        self.persist(&registrations).await;

        info!(registration_id = %existing.registration_id, "Native registration revoked");
        Ok(())
    }

    /// Write the local map through to the store. The hub has already
    /// accepted the change, so a failed write is logged, not returned.
    async fn persist(&self, registrations: &Registrations) {
        if let Err(e) = self.store.save(registrations).await {
            error!("Failed to persist registrations: {}", e);
        }
    }

    fn installation_url(&self, conn: &ConnectionString, hub_path: &str, id: &str) -> String {
        format!(
            "{}/installations/{}?api-version={}",
            conn.hub_url(hub_path),
            id,
            API_VERSION
        )
    }

    fn authorization(&self, conn: &ConnectionString, hub_path: &str) -> Result<String, HubError> {
        let expiry = Utc::now().timestamp() + self.sas_ttl.as_secs() as i64;
        conn.sas_token(&conn.hub_url(hub_path), expiry)
    }

    /// Extract error information from a failed response.
    async fn extract_error(&self, response: reqwest::Response, hub_path: &str) -> HubError {
        let status = response.status();

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                warn!(status = %status, "Hub rejected credentials");
                HubError::Unauthorized
            }
            StatusCode::NOT_FOUND => HubError::HubNotFound(hub_path.to_string()),
            _ => {
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".into());
                warn!(status = %status, body = %message, "Hub request failed");
                HubError::Api {
                    status: status.as_u16(),
                    message,
                }
            }
        }
    }
}
