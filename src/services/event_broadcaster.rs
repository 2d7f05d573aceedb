//! Change-notification fan-out for test list/result consumers.
//!
//! Uses tokio::sync::broadcast to deliver reload notifications to every
//! subscribed consumer (status bars, annotation renderers, ...).

use tokio::sync::broadcast;

use crate::models::TestEvent;

/// Default capacity for the broadcast channel.
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Broadcasts [`TestEvent`]s to all subscribers.
#[derive(Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<TestEvent>,
}

impl EventBroadcaster {
    /// Create a new EventBroadcaster with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new EventBroadcaster with a specific capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to receive events.
    /// Returns a receiver that will receive all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<TestEvent> {
        self.sender.subscribe()
    }

    /// Broadcast an event to all subscribers.
    /// Returns the number of receivers that received the event.
    /// If there are no subscribers, returns 0 (does not error).
    pub fn send(&self, event: TestEvent) -> usize {
        // Ignore errors when there are no subscribers
        self.sender.send(event).unwrap_or(0)
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
