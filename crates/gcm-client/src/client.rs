//! GCM token issuer HTTP client.

use crate::error::GcmError;
use crate::types::{Delivery, RegisterOutcome};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use urlencoding::encode;

/// Client for the platform push transport.
///
/// Issues device tokens through the `register3` form endpoint and fetches
/// pending inbound deliveries for this device.
#[derive(Clone)]
pub struct GcmClient {
    client: Client,
    base_url: String,
    app_id: String,
    device_id: String,
    device_secret: Option<SecretString>,
}

impl GcmClient {
    /// Create a new GCM client.
    pub fn new(
        base_url: impl Into<String>,
        app_id: impl Into<String>,
        device_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GcmError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            app_id: app_id.into(),
            device_id: device_id.into(),
            device_secret: None,
        })
    }

    /// Attach device credentials sent as `AidLogin` authorization.
    pub fn with_device_secret(mut self, secret: impl Into<String>) -> Self {
        self.device_secret = Some(SecretString::new(secret.into()));
        self
    }

    /// Get the configured device id.
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Obtain a push token for `sender_id`.
    #[instrument(skip(self))]
    pub async fn issue_token(&self, sender_id: &str) -> Result<String, GcmError> {
        if sender_id.is_empty() {
            return Err(GcmError::MissingSender);
        }

        let url = format!("{}/c2dm/register3", self.base_url);
        debug!(url = %url, "Requesting push token");

        let mut request = self.client.post(&url).form(&[
            ("app", self.app_id.as_str()),
            ("device", self.device_id.as_str()),
            ("sender", sender_id),
        ]);

        if let Some(secret) = &self.device_secret {
            request = request.header(
                "Authorization",
                format!("AidLogin {}:{}", self.device_id, secret.expose_secret()),
            );
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            warn!(status = %status, body = %body, "Token issuance failed");
            return Err(GcmError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        match RegisterOutcome::parse(&body)? {
            RegisterOutcome::Token(token) => {
                debug!("Push token issued");
                Ok(token)
            }
            RegisterOutcome::Error(code) => {
                warn!(code = %code, "Token issuer rejected registration");
                Err(GcmError::Rejected(code))
            }
        }
    }

    /// Fetch inbound deliveries queued for this device.
    #[instrument(skip(self))]
    pub async fn fetch_deliveries(&self) -> Result<Vec<Delivery>, GcmError> {
        let url = format!(
            "{}/v1/deliveries/{}",
            self.base_url,
            encode(&self.device_id)
        );

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response.text().await.unwrap_or_default();
            return Err(GcmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let entries: Vec<Value> = serde_json::from_str(&body)?;

        let mut deliveries = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            match entry {
                Value::Object(delivery) => deliveries.push(delivery),
                _ => warn!(index, "Skipping delivery that is not a JSON object"),
            }
        }

        Ok(deliveries)
    }
}
