//! Inbound delivery receiver with polling.

use crate::client::GcmClient;
use crate::types::Delivery;
use std::time::Duration;
use tokio::time::sleep;
use tokio_stream::Stream;
use tracing::{debug, error};

/// Back-off applied after a failed poll.
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Receiver that polls the transport for pushes addressed to this device.
pub struct DeliveryReceiver {
    client: GcmClient,
    poll_interval: Duration,
}

impl DeliveryReceiver {
    /// Create a new delivery receiver.
    pub fn new(client: GcmClient, poll_interval: Duration) -> Self {
        Self {
            client,
            poll_interval,
        }
    }

    /// Start receiving deliveries as an async stream, in transport order.
    pub fn stream(self) -> impl Stream<Item = Delivery> {
        async_stream::stream! {
            loop {
                match self.client.fetch_deliveries().await {
                    Ok(deliveries) => {
                        if !deliveries.is_empty() {
                            debug!(count = deliveries.len(), "Received deliveries");
                        }
                        for delivery in deliveries {
                            yield delivery;
                        }
                    }
                    Err(e) => {
                        error!("Delivery poll error: {}", e);
                        sleep(ERROR_BACKOFF).await;
                        continue;
                    }
                }

                sleep(self.poll_interval).await;
            }
        }
    }
}
