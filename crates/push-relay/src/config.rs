//! Configuration for the push relay.

use crate::retry::{CallPolicy, RetryPolicy};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Relay configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Platform push transport
    #[serde(default)]
    pub gcm: GcmConfig,

    /// Notification hub transport
    #[serde(default)]
    pub hub: HubConfig,

    /// Timeouts and retry for remote calls
    #[serde(default)]
    pub relay: RelayConfig,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GcmConfig {
    /// Base URL of the token issuer
    #[serde(default = "default_gcm_base_url")]
    pub base_url: String,

    /// Application package the tokens are issued for
    #[serde(default = "default_app_id")]
    pub app_id: String,

    #[serde(default = "default_device_id")]
    pub device_id: String,

    /// Sent as `AidLogin` credentials when set
    #[serde(default)]
    pub device_secret: Option<String>,

    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Poll the transport for inbound deliveries
    #[serde(default)]
    pub poll_deliveries: bool,

    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Lifetime of signed SAS tokens
    #[serde(default = "default_sas_ttl", with = "humantime_serde")]
    pub sas_ttl: Duration,

    /// File holding local registrations (in-memory if unset)
    #[serde(default)]
    pub store_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Upper bound for each remote call attempt
    #[serde(default = "default_call_timeout", with = "humantime_serde")]
    pub call_timeout: Duration,

    #[serde(default)]
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Invocations per minute allowed for each action
    #[serde(default = "default_per_action_rpm")]
    pub per_action_per_minute: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for GcmConfig {
    fn default() -> Self {
        Self {
            base_url: default_gcm_base_url(),
            app_id: default_app_id(),
            device_id: default_device_id(),
            device_secret: None,
            request_timeout: default_request_timeout(),
            poll_deliveries: false,
            poll_interval: default_poll_interval(),
        }
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
            sas_ttl: default_sas_ttl(),
            store_path: None,
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            call_timeout: default_call_timeout(),
            retry: RetryPolicy::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: default_port(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_action_per_minute: default_per_action_rpm(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_gcm_base_url() -> String {
    "https://android.clients.google.com".into()
}

fn default_app_id() -> String {
    "com.example.pushrelay".into()
}

fn default_device_id() -> String {
    "push-relay".into()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(2)
}

fn default_sas_ttl() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_call_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_listen_addr() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    8080
}

fn default_per_action_rpm() -> u32 {
    60
}

fn default_log_level() -> String {
    "info".into()
}

impl RelayConfig {
    pub fn call_policy(&self) -> CallPolicy {
        CallPolicy::new(self.call_timeout, self.retry.clone())
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(false),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.relay.call_timeout.is_zero() {
            bail!("relay.call_timeout must be greater than zero");
        }
        if self.rate_limit.per_action_per_minute == 0 {
            bail!("rate_limit.per_action_per_minute must be greater than zero");
        }
        if let Err(e) = self.relay.retry.validate() {
            bail!("relay.retry: {}", e);
        }
        Ok(())
    }
}
