//! Live observation of board mutations.
//!
//! Observers are notified after each mutation has been applied, so a
//! signal always reflects state the board actually holds. Dead observers
//! (dropped receivers) are pruned on the next notification.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::RwLock;

use eventdesk_types::{EventRequest, RequestId};

/// A mutation notification from the board.
#[derive(Debug, Clone, PartialEq)]
pub enum BoardSignal {
    /// The board was replaced wholesale.
    Seeded { count: usize },
    /// A row was inserted or replaced and moved to the front.
    Upserted(EventRequest),
    /// A row was removed.
    Deleted(RequestId),
}

/// A subscription to board mutation signals.
pub struct BoardSubscription {
    receiver: Receiver<BoardSignal>,
}

impl BoardSubscription {
    fn new(receiver: Receiver<BoardSignal>) -> Self {
        Self { receiver }
    }

    /// Blocks until the next signal, or `None` when the board is gone.
    pub fn recv(&self) -> Option<BoardSignal> {
        self.receiver.recv().ok()
    }

    /// Non-blocking receive.
    pub fn try_recv(&self) -> Option<BoardSignal> {
        self.receiver.try_recv().ok()
    }

    /// Blocking iterator over signals.
    pub fn iter(&self) -> impl Iterator<Item = BoardSignal> + '_ {
        std::iter::from_fn(|| self.recv())
    }
}

/// Fan-out hub for board observers.
#[derive(Debug, Default)]
pub struct BoardHub {
    subscribers: RwLock<Vec<Sender<BoardSignal>>>,
}

impl BoardHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new observer. Signals emitted before this call are not
    /// replayed.
    pub fn subscribe(&self) -> BoardSubscription {
        let (sender, receiver) = mpsc::channel();
        self.subscribers
            .write()
            .expect("lock poisoned")
            .push(sender);
        BoardSubscription::new(receiver)
    }

    /// Delivers a signal to all observers, pruning dead ones.
    pub fn notify(&self, signal: BoardSignal) {
        let mut subscribers = self.subscribers.write().expect("lock poisoned");
        subscribers.retain(|sender| sender.send(signal.clone()).is_ok());
    }

    /// The observer count. May include dead observers not yet pruned.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().expect("lock poisoned").len()
    }
}
