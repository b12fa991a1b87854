//! Reply channels and the single-slot channel registry.
//!
//! Every call result and every relayed notification goes out through the one
//! channel currently held by [`ChannelRegistry`]. A new invocation replaces
//! the held channel; the previous one is closed and stops receiving.

use crate::types::{NotificationPayload, RegistrationRecord, REGISTER_EVENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::{mpsc, watch};
use tracing::debug;

/// Status half of a reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "UPPERCASE")]
pub enum Outcome {
    Ok { value: Value },
    Error { message: String },
}

/// One message delivered on a reply channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginResult {
    #[serde(flatten)]
    pub outcome: Outcome,

    /// More messages may follow on the same channel
    pub keep_callback: bool,
}

impl PluginResult {
    pub fn ok(value: Value) -> Self {
        Self {
            outcome: Outcome::Ok { value },
            keep_callback: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Error {
                message: message.into(),
            },
            keep_callback: false,
        }
    }

    /// Acknowledgement without payload.
    pub fn ack() -> Self {
        Self::ok(Value::Null)
    }

    /// Successful registration; keeps the channel open for notifications.
    pub fn registered(record: &RegistrationRecord) -> Self {
        Self::ok(record.to_event_value()).keep_open(true)
    }

    /// Relayed notification; keeps the channel open.
    pub fn notification(payload: NotificationPayload) -> Self {
        Self::ok(payload.into_value()).keep_open(true)
    }

    pub fn keep_open(mut self, keep: bool) -> Self {
        self.keep_callback = keep;
        self
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.outcome, Outcome::Ok { .. })
    }
}

/// Consumer-side reading of a [`PluginResult`].
///
/// Registration results and notifications share a channel; the `event` tag
/// tells them apart.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Registered(RegistrationRecord),
    Notification(NotificationPayload),
    Ack,
    Failed(String),
}

impl From<PluginResult> for Reply {
    fn from(result: PluginResult) -> Self {
        match result.outcome {
            Outcome::Error { message } => Reply::Failed(message),
            Outcome::Ok { value: Value::Null } => Reply::Ack,
            Outcome::Ok { value } => {
                if value.get("event").and_then(Value::as_str) == Some(REGISTER_EVENT) {
                    if let Ok(record) = serde_json::from_value::<RegistrationRecord>(value.clone()) {
                        return Reply::Registered(record);
                    }
                }
                Reply::Notification(NotificationPayload::from_value(value).unwrap_or_default())
            }
        }
    }
}

/// Sending half of a reply channel.
///
/// Once a result without `keep_callback` has gone out, or the channel has
/// been closed, further sends are dropped.
#[derive(Debug, Clone)]
pub struct CallbackChannel {
    tx: mpsc::UnboundedSender<PluginResult>,
    finished: Arc<AtomicBool>,
    closed: Arc<watch::Sender<bool>>,
}

impl CallbackChannel {
    /// Create a channel and the receiver the consumer reads from.
    pub fn new() -> (Self, ReplyReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (closed_tx, closed_rx) = watch::channel(false);
        let channel = Self {
            tx,
            finished: Arc::new(AtomicBool::new(false)),
            closed: Arc::new(closed_tx),
        };
        (
            channel,
            ReplyReceiver {
                rx,
                closed: closed_rx,
            },
        )
    }

    /// Mark the channel superseded. Results already queued are still
    /// readable; the receiver then reports end of stream.
    pub fn close(&self) {
        self.finished.store(true, Ordering::Release);
        self.closed.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Send a result. Returns false if it could not be delivered.
    pub fn send(&self, result: PluginResult) -> bool {
        if !result.keep_callback {
            if self.finished.swap(true, Ordering::AcqRel) {
                debug!("Channel already finished, dropping result");
                return false;
            }
        } else if self.finished.load(Ordering::Acquire) {
            debug!("Channel already finished, dropping result");
            return false;
        }

        self.tx.send(result).is_ok()
    }

    /// The consumer has dropped its receiver.
    pub fn is_detached(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves once the consumer drops its receiver.
    pub async fn detached(&self) {
        self.tx.closed().await
    }

    pub fn same_channel(&self, other: &CallbackChannel) -> bool {
        self.tx.same_channel(&other.tx)
    }
}

/// Receiving half of a reply channel.
#[derive(Debug)]
pub struct ReplyReceiver {
    rx: mpsc::UnboundedReceiver<PluginResult>,
    closed: watch::Receiver<bool>,
}

impl ReplyReceiver {
    /// Next result, or `None` once every sender is gone or the channel has
    /// been closed and drained.
    pub async fn recv(&mut self) -> Option<PluginResult> {
        if let Ok(result) = self.rx.try_recv() {
            return Some(result);
        }
        if *self.closed.borrow() {
            return None;
        }

        tokio::select! {
            biased;
            result = self.rx.recv() => return result,
            _ = self.closed.wait_for(|closed| *closed) => {}
        }

        self.rx.try_recv().ok()
    }

    /// Next result if one is already queued.
    pub fn try_recv(&mut self) -> Option<PluginResult> {
        self.rx.try_recv().ok()
    }
}

/// Process-wide single slot holding the current reply channel.
///
/// Owned explicitly and shared by `Arc` between the components that deliver
/// through it. `set` replaces unconditionally; last caller wins.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    slot: RwLock<Option<CallbackChannel>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current channel, returning the one it superseded.
    ///
    /// The superseded channel is closed unless it is the same channel.
    pub fn set(&self, channel: CallbackChannel) -> Option<CallbackChannel> {
        let previous = {
            let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
            slot.replace(channel.clone())
        };

        if let Some(previous) = &previous {
            if !previous.same_channel(&channel) {
                debug!("Closing superseded channel");
                previous.close();
            }
        }

        previous
    }

    /// The current channel, if a consumer is attached.
    pub fn get(&self) -> Option<CallbackChannel> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Detach the current channel.
    pub fn clear(&self) -> Option<CallbackChannel> {
        self.slot
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// A channel is held and its consumer is still reading.
    pub fn is_attached(&self) -> bool {
        self.get().is_some_and(|channel| !channel.is_detached())
    }

    /// Deliver through the current channel. With no channel the result is
    /// dropped and false is returned.
    pub fn deliver(&self, result: PluginResult) -> bool {
        match self.get() {
            Some(channel) => channel.send(result),
            None => {
                debug!("No consumer attached, dropping result");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plugin_result_wire_format() {
        let ok = serde_json::to_value(PluginResult::ok(json!({"a": 1})).keep_open(true)).unwrap();
        assert_eq!(
            ok,
            json!({"status": "OK", "value": {"a": 1}, "keepCallback": true})
        );

        let err = serde_json::to_value(PluginResult::error("nope")).unwrap();
        assert_eq!(
            err,
            json!({"status": "ERROR", "message": "nope", "keepCallback": false})
        );

        let back: PluginResult = serde_json::from_value(err).unwrap();
        assert_eq!(back, PluginResult::error("nope"));
    }

    #[test]
    fn test_finished_channel_drops_results() {
        let (channel, mut rx) = CallbackChannel::new();

        assert!(channel.send(PluginResult::ack()));
        assert!(!channel.send(PluginResult::ack()));
        assert!(!channel.send(PluginResult::ok(json!({"late": true})).keep_open(true)));

        assert_eq!(rx.try_recv(), Some(PluginResult::ack()));
        assert_eq!(rx.try_recv(), None);
    }

    #[test]
    fn test_keep_open_results_keep_flowing() {
        let (channel, mut rx) = CallbackChannel::new();

        for i in 0..3 {
            assert!(channel.send(PluginResult::ok(json!({"n": i})).keep_open(true)));
        }

        for i in 0..3 {
            assert_eq!(
                rx.try_recv(),
                Some(PluginResult::ok(json!({"n": i})).keep_open(true))
            );
        }
    }

    #[test]
    fn test_registry_last_writer_wins() {
        let registry = ChannelRegistry::new();
        let (a, mut rx_a) = CallbackChannel::new();
        let (b, mut rx_b) = CallbackChannel::new();

        assert!(registry.set(a.clone()).is_none());
        let previous = registry.set(b).unwrap();
        assert!(previous.same_channel(&a));

        registry.deliver(PluginResult::ack().keep_open(true));
        assert!(rx_a.try_recv().is_none());
        assert!(rx_b.try_recv().is_some());
        assert!(a.is_closed());
    }

    #[tokio::test]
    async fn test_superseded_receiver_drains_then_ends() {
        let registry = ChannelRegistry::new();
        let (a, mut rx_a) = CallbackChannel::new();
        let (b, _rx_b) = CallbackChannel::new();

        registry.set(a.clone());
        registry.deliver(PluginResult::ok(json!({"n": 1})).keep_open(true));
        registry.set(b);

        assert!(!a.send(PluginResult::ok(json!({"n": 2})).keep_open(true)));
        assert_eq!(
            rx_a.recv().await,
            Some(PluginResult::ok(json!({"n": 1})).keep_open(true))
        );
        assert_eq!(rx_a.recv().await, None);
    }

    #[test]
    fn test_setting_same_channel_keeps_it_open() {
        let registry = ChannelRegistry::new();
        let (a, _rx) = CallbackChannel::new();

        registry.set(a.clone());
        registry.set(a.clone());
        assert!(!a.is_closed());
    }

    #[test]
    fn test_registry_without_consumer_drops() {
        let registry = ChannelRegistry::new();
        assert!(!registry.is_attached());
        assert!(!registry.deliver(PluginResult::ack()));
        assert!(registry.get().is_none());
    }

    #[test]
    fn test_registry_reports_detached_consumer() {
        let registry = ChannelRegistry::new();
        let (channel, rx) = CallbackChannel::new();
        registry.set(channel);
        assert!(registry.is_attached());

        drop(rx);
        assert!(!registry.is_attached());
        assert!(registry.get().is_some());

        registry.clear();
        assert!(registry.get().is_none());
    }

    #[test]
    fn test_reply_classification() {
        let record = RegistrationRecord {
            registration_id: "R1".into(),
            channel_uri: "T1".into(),
            notification_hub_path: "hub1".into(),
        };

        assert_eq!(
            Reply::from(PluginResult::registered(&record)),
            Reply::Registered(record)
        );
        assert_eq!(Reply::from(PluginResult::ack()), Reply::Ack);
        assert_eq!(
            Reply::from(PluginResult::error("bad")),
            Reply::Failed("bad".into())
        );

        let payload = NotificationPayload::from_value(json!({"message": "hello"})).unwrap();
        assert_eq!(
            Reply::from(PluginResult::notification(payload.clone())),
            Reply::Notification(payload)
        );
    }
}
