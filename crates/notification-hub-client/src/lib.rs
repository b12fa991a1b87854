//! Notification hub client.
//!
//! Talks to a cloud notification hub over its REST surface:
//! - parses hub connection strings and signs requests with SAS tokens
//! - registers platform push tokens as installations
//! - revokes the installation this device registered earlier

mod client;
mod connection;
mod error;
pub mod store;
mod types;

pub use client::NotificationHubClient;
pub use connection::ConnectionString;
pub use error::HubError;
pub use store::Store;
pub use types::*;
