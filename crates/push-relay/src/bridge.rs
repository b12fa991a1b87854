//! Invocation bridge: named actions with positional JSON arguments.
//!
//! Arguments follow the host script's layout:
//! `[hubPath, connectionString, handlerName, tags, options]`.

use crate::channel::{CallbackChannel, ChannelRegistry};
use crate::coordinator::RegistrationCoordinator;
use crate::deregistration::DeregistrationHandler;
use crate::error::RelayError;
use crate::relay::NotificationRelay;
use crate::retry::CallPolicy;
use crate::transport::{HubTransport, PlatformTransport};
use crate::types::{RegistrationRequest, REGISTER_EVENT};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub const UNREGISTER_EVENT: &str = "unregisterApplication";

const HUB_PATH_INDEX: usize = 0;
const CONNECTION_STRING_INDEX: usize = 1;
const OPTIONS_INDEX: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    RegisterApplication,
    UnregisterApplication,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::RegisterApplication => REGISTER_EVENT,
            Action::UnregisterApplication => UNREGISTER_EVENT,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            REGISTER_EVENT => Ok(Action::RegisterApplication),
            UNREGISTER_EVENT => Ok(Action::UnregisterApplication),
            other => Err(RelayError::UnrecognizedAction(other.to_string())),
        }
    }
}

/// A validated invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Register(RegistrationRequest),
    Unregister {
        hub_identifier: String,
        connection_credential: String,
    },
}

impl Invocation {
    /// Validate positional arguments for `action`.
    pub fn parse(action: Action, args: &[Value]) -> Result<Self, RelayError> {
        let hub_identifier = required_string(args, HUB_PATH_INDEX, "notificationHubPath")?;
        let connection_credential =
            required_string(args, CONNECTION_STRING_INDEX, "connectionString")?;

        match action {
            Action::RegisterApplication => Ok(Invocation::Register(RegistrationRequest {
                hub_identifier,
                connection_credential,
                sender_identifier: sender_id(args.get(OPTIONS_INDEX))?,
            })),
            Action::UnregisterApplication => Ok(Invocation::Unregister {
                hub_identifier,
                connection_credential,
            }),
        }
    }
}

fn required_string(args: &[Value], index: usize, name: &str) -> Result<String, RelayError> {
    match args.get(index).and_then(Value::as_str) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(empty_argument(name)),
    }
}

/// The sender id is passed either directly or inside the options object.
fn sender_id(options: Option<&Value>) -> Result<String, RelayError> {
    let value = match options {
        Some(Value::String(sender)) => Some(sender.as_str()),
        Some(Value::Object(options)) => options
            .get("senderId")
            .or_else(|| options.get("senderID"))
            .and_then(Value::as_str),
        _ => None,
    };

    match value {
        Some(sender) if !sender.is_empty() => Ok(sender.to_string()),
        _ => Err(empty_argument("senderId")),
    }
}

fn empty_argument(name: &str) -> RelayError {
    RelayError::InvalidArgument(format!("{} can't be null or empty", name))
}

/// What an accepted invocation left running.
#[derive(Debug)]
pub enum Dispatch {
    /// Registration work continues in the background.
    Pending(JoinHandle<()>),
    /// The outcome has already been delivered.
    Completed,
}

/// Entry point for host invocations. Owns the channel registry and wires
/// it into every component that delivers results.
#[derive(Clone)]
pub struct Bridge {
    channels: Arc<ChannelRegistry>,
    coordinator: RegistrationCoordinator,
    deregistration: DeregistrationHandler,
    relay: NotificationRelay,
}

impl Bridge {
    pub fn new(
        platform: Arc<dyn PlatformTransport>,
        hub: Arc<dyn HubTransport>,
        policy: CallPolicy,
    ) -> Self {
        let channels = Arc::new(ChannelRegistry::new());

        Self {
            coordinator: RegistrationCoordinator::new(
                platform,
                hub.clone(),
                channels.clone(),
                policy.clone(),
            ),
            deregistration: DeregistrationHandler::new(hub, channels.clone(), policy),
            relay: NotificationRelay::new(channels.clone()),
            channels,
        }
    }

    pub fn channels(&self) -> &Arc<ChannelRegistry> {
        &self.channels
    }

    pub fn relay(&self) -> &NotificationRelay {
        &self.relay
    }

    /// Execute `action` with `args`, replying on `channel`.
    ///
    /// Unknown actions and invalid arguments are rejected here, before the
    /// registry is touched. Otherwise `channel` becomes the current channel.
    pub async fn execute(
        &self,
        action: &str,
        args: &[Value],
        channel: CallbackChannel,
    ) -> Result<Dispatch, RelayError> {
        let action: Action = action.parse()?;
        let invocation = Invocation::parse(action, args)?;

        if self.channels.set(channel.clone()).is_some() {
            debug!(%action, "Replaced current reply channel");
        }

        match invocation {
            Invocation::Register(request) => {
                info!(hub = %request.hub_identifier, "Dispatching registration");
                Ok(Dispatch::Pending(self.coordinator.dispatch(request, channel)))
            }
            Invocation::Unregister {
                hub_identifier,
                connection_credential,
            } => {
                self.deregistration
                    .handle(&hub_identifier, &connection_credential)
                    .await;
                Ok(Dispatch::Completed)
            }
        }
    }
}
