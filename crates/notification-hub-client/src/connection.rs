//! Hub connection strings and shared access signatures.

use crate::error::HubError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;
use urlencoding::encode;

type HmacSha256 = Hmac<Sha256>;

/// Parsed hub connection string.
///
/// Format: `Endpoint=sb://<ns>.servicebus.windows.net/;SharedAccessKeyName=<name>;SharedAccessKey=<key>`.
/// The key is kept as a `SecretString` so it never lands in logs.
#[derive(Clone)]
pub struct ConnectionString {
    endpoint: String,
    key_name: String,
    key: SecretString,
}

impl ConnectionString {
    /// HTTP(S) base URL of the namespace, always ending in `/`.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Name of the shared access policy.
    pub fn key_name(&self) -> &str {
        &self.key_name
    }

    /// Resource URL for a hub path under this namespace.
    pub fn hub_url(&self, hub_path: &str) -> String {
        format!("{}{}", self.endpoint, hub_path)
    }

    /// Build a `SharedAccessSignature` authorization value for `resource_uri`
    /// that expires at `expiry` (unix seconds).
    ///
    /// The signed target is lowercased after encoding too, so the escapes
    /// read `%3a%2f%2f` as the hub service computes them.
    pub fn sas_token(&self, resource_uri: &str, expiry: i64) -> Result<String, HubError> {
        let target = encode(&resource_uri.to_lowercase()).to_lowercase();
        let to_sign = format!("{}\n{}", target, expiry);

        let mut mac = HmacSha256::new_from_slice(self.key.expose_secret().as_bytes())
            .map_err(|e| HubError::Signing(e.to_string()))?;
        mac.update(to_sign.as_bytes());
        let signature = STANDARD.encode(mac.finalize().into_bytes());

        Ok(format!(
            "SharedAccessSignature sr={}&sig={}&se={}&skn={}",
            target,
            encode(&signature),
            expiry,
            self.key_name
        ))
    }
}

impl FromStr for ConnectionString {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut endpoint = None;
        let mut key_name = None;
        let mut key = None;

        for part in s.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            // Segment content is never echoed back; it may hold the key.
            let (name, value) = part.split_once('=').ok_or_else(|| {
                HubError::InvalidConnectionString("segment without '='".into())
            })?;

            match name.to_ascii_lowercase().as_str() {
                "endpoint" => endpoint = Some(value.to_string()),
                "sharedaccesskeyname" => key_name = Some(value.to_string()),
                "sharedaccesskey" => key = Some(value.to_string()),
                _ => {}
            }
        }

        let endpoint = endpoint
            .filter(|v| !v.is_empty())
            .ok_or_else(|| HubError::InvalidConnectionString("missing Endpoint".into()))?;
        let key_name = key_name
            .filter(|v| !v.is_empty())
            .ok_or_else(|| HubError::InvalidConnectionString("missing SharedAccessKeyName".into()))?;
        let key = key
            .filter(|v| !v.is_empty())
            .ok_or_else(|| HubError::InvalidConnectionString("missing SharedAccessKey".into()))?;

        Ok(Self {
            endpoint: normalize_endpoint(&endpoint)?,
            key_name,
            key: SecretString::new(key),
        })
    }
}

impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionString")
            .field("endpoint", &self.endpoint)
            .field("key_name", &self.key_name)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Map `sb://` service bus endpoints onto `https://` and ensure a trailing slash.
fn normalize_endpoint(endpoint: &str) -> Result<String, HubError> {
    let url = if let Some(rest) = endpoint.strip_prefix("sb://") {
        format!("https://{}", rest)
    } else if endpoint.starts_with("https://") || endpoint.starts_with("http://") {
        endpoint.to_string()
    } else {
        return Err(HubError::InvalidConnectionString(format!(
            "unsupported endpoint scheme: {}",
            endpoint
        )));
    };

    if url.ends_with('/') {
        Ok(url)
    } else {
        Ok(format!("{}/", url))
    }
}
