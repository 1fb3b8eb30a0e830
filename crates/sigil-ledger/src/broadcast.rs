//! Change notification between registries sharing one storage backend.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Name of the ledger notification channel.
pub const LEDGER_CHANNEL_NAME: &str = "kai-sigil-ledger";

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LedgerNotification {
    #[serde(rename = "ledger:update", rename_all = "camelCase")]
    Update { event_id: String },
}

pub trait LedgerBroadcast: Send + Sync {
    fn channel_name(&self) -> &str;

    /// Deliver to current subscribers; returns how many received it.
    fn publish(&self, notification: LedgerNotification) -> usize;

    fn subscribe(&self) -> broadcast::Receiver<LedgerNotification>;
}

/// [`LedgerBroadcast`] over a `tokio::sync::broadcast` channel.
#[derive(Debug)]
pub struct TokioBroadcast {
    name: String,
    sender: broadcast::Sender<LedgerNotification>,
}

impl TokioBroadcast {
    pub fn new() -> Self {
        Self::named(LEDGER_CHANNEL_NAME)
    }

    pub fn named(name: impl Into<String>) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            name: name.into(),
            sender,
        }
    }
}

impl Default for TokioBroadcast {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerBroadcast for TokioBroadcast {
    fn channel_name(&self) -> &str {
        &self.name
    }

    fn publish(&self, notification: LedgerNotification) -> usize {
        match self.sender.send(notification) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(n)) => {
                tracing::debug!(channel = %self.name, ?n, "no ledger subscribers");
                0
            }
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<LedgerNotification> {
        self.sender.subscribe()
    }
}
