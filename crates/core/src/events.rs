//! Event System
//!
//! Provides a pub/sub event bus so editors and tools can observe build
//! model changes without holding a reference to the model.

use std::path::PathBuf;
use parking_lot::RwLock;
use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::debug;

/// Events emitted while a build script is loaded and edited
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Build script read from disk
    DocumentLoaded(PathBuf),
    /// Build script written to disk
    DocumentSaved(PathBuf),
    /// A property was changed in the model (not yet in the text)
    PropertyChanged { qualified_name: String },
    /// Pending model changes were written into the document
    ChangesApplied { edits: usize },
    /// Applying changes failed and the document was restored
    ChangesRolledBack { reason: String },
}

/// Subscriber handle for receiving events
#[derive(Clone)]
pub struct EventSubscription {
    receiver: Receiver<Event>,
}

impl EventSubscription {
    /// Receive the next event (blocking)
    pub fn recv(&self) -> Result<Event, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking)
    pub fn try_recv(&self) -> Result<Event, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Drain all events received so far
    pub fn drain(&self) -> Vec<Event> {
        self.receiver.try_iter().collect()
    }
}

/// Event bus for publish/subscribe pattern
pub struct EventBus {
    subscribers: RwLock<Vec<Sender<Event>>>,
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> EventSubscription {
        let (sender, receiver) = unbounded();
        self.subscribers.write().push(sender);
        EventSubscription { receiver }
    }

    /// Emit an event to all subscribers, dropping the ones that hung up
    pub fn emit(&self, event: Event) -> usize {
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|sender| sender.send(event.clone()).is_ok());
        let delivered = subscribers.len();

        debug!("Event {:?} delivered to {} subscribers", event, delivered);
        delivered
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_bus() {
        let bus = EventBus::new();
        let sub1 = bus.subscribe();
        let sub2 = bus.subscribe();

        assert_eq!(bus.subscriber_count(), 2);

        let delivered = bus.emit(Event::ChangesApplied { edits: 3 });
        assert_eq!(delivered, 2);

        assert_eq!(sub1.try_recv().unwrap(), Event::ChangesApplied { edits: 3 });
        assert!(sub2.try_recv().is_ok());
    }

    #[test]
    fn test_emit_drops_closed_subscribers() {
        let bus = EventBus::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());

        let delivered = bus.emit(Event::PropertyChanged { qualified_name: "ext.foo".into() });
        assert_eq!(delivered, 1);
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(kept.drain().len(), 1);
    }
}
