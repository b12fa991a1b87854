//! Push relay: device registration and notification relay service.
//!
//! A host invokes `registerApplication` or `unregisterApplication` over HTTP
//! and reads results from the reply stream it opened. The relay:
//! - obtains a push token from the platform transport
//! - registers that token with a notification hub
//! - forwards inbound pushes to the most recent caller's reply stream

pub mod api;
pub mod bridge;
pub mod channel;
pub mod config;
pub mod coordinator;
pub mod deregistration;
pub mod error;
pub mod relay;
pub mod retry;
pub mod transport;
pub mod types;

pub use bridge::{Action, Bridge, Dispatch, Invocation};
pub use channel::{CallbackChannel, ChannelRegistry, PluginResult, Reply, ReplyReceiver};
pub use config::Config;
pub use error::{RelayError, TransportError};
pub use relay::NotificationRelay;
pub use retry::{CallPolicy, RetryPolicy};
pub use transport::{HubTransport, PlatformTransport};
pub use types::{NotificationPayload, RegistrationRecord, RegistrationRequest};
