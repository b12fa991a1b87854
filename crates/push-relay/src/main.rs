//! Push relay - Entry point.

use anyhow::{Context, Result};
use gcm_client::{DeliveryReceiver, GcmClient};
use notification_hub_client::{NotificationHubClient, Store};
use push_relay::{
    api::{create_router_with_rate_limit, AppState, RateLimitState},
    config::Config,
    Bridge,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config.log.level);

    if let Err(e) = run(config).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn run(config: Config) -> Result<()> {
    info!("Starting push relay");

    let mut gcm = GcmClient::new(
        &config.gcm.base_url,
        &config.gcm.app_id,
        &config.gcm.device_id,
        config.gcm.request_timeout,
    )
    .context("Failed to create GCM client")?;
    if let Some(secret) = &config.gcm.device_secret {
        gcm = gcm.with_device_secret(secret);
    }

    let store = match &config.hub.store_path {
        Some(path) => {
            info!(path = %path.display(), "Using file-backed registration store");
            Store::file(path.clone())
        }
        None => {
            info!("No store path configured, registrations are kept in memory");
            Store::memory()
        }
    };
    let hub = NotificationHubClient::open(config.hub.request_timeout, store)
        .await
        .context("Failed to open notification hub client")?
        .with_sas_ttl(config.hub.sas_ttl);

    let bridge = Bridge::new(
        Arc::new(gcm.clone()),
        Arc::new(hub),
        config.relay.call_policy(),
    );

    if config.gcm.poll_deliveries {
        info!(interval = ?config.gcm.poll_interval, "Polling for inbound deliveries");
        let receiver = DeliveryReceiver::new(gcm, config.gcm.poll_interval);
        tokio::spawn(bridge.relay().clone().run(receiver.stream()));
    }

    let app = create_router_with_rate_limit(
        AppState::new(bridge),
        RateLimitState::new(config.rate_limit.per_action_per_minute),
    );

    let addr = SocketAddr::new(
        config
            .server
            .listen_addr
            .parse()
            .unwrap_or([0, 0, 0, 0].into()),
        config.server.port,
    );

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
