//! Per-collection subscription hub.
//!
//! The socket task pushes normalized events in; each mounted view holds a
//! [`FeedSubscription`] for the collection it displays. Dropping the
//! subscription releases the channel; dead subscribers are pruned on the
//! next notification.

use std::collections::HashMap;
use std::sync::RwLock;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use eventdesk_types::ChangeEvent;

/// Events delivered to feed subscribers.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// A normalized change on the subscribed collection.
    Change(ChangeEvent),
    /// The channel reconnected after a failure. The consumer must reseed
    /// its store from a one-shot fetch before applying further changes.
    Resync,
    /// Reconnection gave up; live updates are unavailable until a new
    /// connect attempt is made.
    Lost(String),
}

/// A subscription to one collection's change events.
pub struct FeedSubscription {
    collection: String,
    receiver: UnboundedReceiver<FeedEvent>,
}

impl FeedSubscription {
    fn new(collection: String, receiver: UnboundedReceiver<FeedEvent>) -> Self {
        Self {
            collection,
            receiver,
        }
    }

    /// The collection this subscription observes.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Waits for the next event. Returns `None` once the subscription is
    /// closed (hub dropped or subscription cancelled server-side).
    pub async fn recv(&mut self) -> Option<FeedEvent> {
        self.receiver.recv().await
    }

    /// Non-blocking receive for polling contexts.
    pub fn try_recv(&mut self) -> Option<FeedEvent> {
        self.receiver.try_recv().ok()
    }

    /// Cancels delivery. Equivalent to dropping the subscription; the hub
    /// prunes the sender on its next notification.
    pub fn cancel(self) {
        tracing::debug!(collection = %self.collection, "feed subscription cancelled");
    }
}

/// Fan-out hub mapping collection names to live subscribers.
#[derive(Debug, Default)]
pub struct FeedHub {
    subscribers: RwLock<HashMap<String, Vec<UnboundedSender<FeedEvent>>>>,
}

impl FeedHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber for a collection.
    ///
    /// Events delivered before this call are not replayed; the consumer
    /// seeds itself from a one-shot fetch.
    pub fn subscribe(&self, collection: &str) -> FeedSubscription {
        let (sender, receiver) = mpsc::unbounded_channel();

        let mut subscribers = self.subscribers.write().expect("lock poisoned");
        subscribers
            .entry(collection.to_string())
            .or_default()
            .push(sender);

        FeedSubscription::new(collection.to_string(), receiver)
    }

    /// Delivers an event to every subscriber of a collection, pruning the
    /// subscribers whose receiving half is gone.
    pub fn notify(&self, collection: &str, event: FeedEvent) {
        let mut subscribers = self.subscribers.write().expect("lock poisoned");
        if let Some(senders) = subscribers.get_mut(collection) {
            senders.retain(|sender| sender.send(event.clone()).is_ok());
        }
    }

    /// Delivers an event to every subscriber of every collection.
    ///
    /// Used for channel-level signals (`Resync`, `Lost`) that apply to all
    /// topics at once.
    pub fn broadcast(&self, event: FeedEvent) {
        let mut subscribers = self.subscribers.write().expect("lock poisoned");
        for senders in subscribers.values_mut() {
            senders.retain(|sender| sender.send(event.clone()).is_ok());
        }
    }

    /// The live subscriber count for a collection. May include dead
    /// subscribers not yet pruned by a notification.
    pub fn subscriber_count(&self, collection: &str) -> usize {
        let subscribers = self.subscribers.read().expect("lock poisoned");
        subscribers.get(collection).map(|s| s.len()).unwrap_or(0)
    }
}
