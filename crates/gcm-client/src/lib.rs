//! GCM platform transport client.

mod client;
mod error;
mod receiver;
mod types;

pub use client::GcmClient;
pub use error::GcmError;
pub use receiver::DeliveryReceiver;
pub use types::*;
