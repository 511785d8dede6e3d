//! Change notification fan-out.
//!
//! Consumers do not get per-field callbacks; they get a [`ChangeEvent`]
//! telling them which surface changed and re-read it wholesale. Events go
//! over bounded channels; a listener that stops draining its buffer is
//! dropped rather than allowed to stall producers.

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

use crate::types::AgentId;

/// Default buffered events per listener before it is dropped.
const DEFAULT_BUFFER_SIZE: usize = 256;

/// Which read surface changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChangeEvent {
    /// The metrics snapshot for one agent was replaced (or forgotten).
    Metrics(AgentId),
    /// The evaluation list was replaced.
    Evaluations,
    /// The feed status changed (loading/ready/error).
    FeedStatus,
}

/// Unique identifier for a change listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Receiving end of a change subscription.
pub struct ChangeListener {
    pub id: ListenerId,
    receiver: Receiver<ChangeEvent>,
}

impl ChangeListener {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<ChangeEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<ChangeEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<ChangeEvent, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// Fans change events out to all registered listeners.
pub struct ChangeNotifier {
    listeners: RwLock<HashMap<ListenerId, Sender<ChangeEvent>>>,
    next_id: AtomicU64,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a listener with the default buffer size.
    pub fn subscribe(&self) -> ChangeListener {
        self.subscribe_with_buffer(DEFAULT_BUFFER_SIZE)
    }

    /// Register a listener with an explicit buffer size.
    pub fn subscribe_with_buffer(&self, buffer_size: usize) -> ChangeListener {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(buffer_size);
        self.listeners.write().insert(id, sender);
        ChangeListener { id, receiver }
    }

    /// Remove a listener.
    pub fn unsubscribe(&self, id: ListenerId) {
        self.listeners.write().remove(&id);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Deliver an event to every listener. Listeners with a full buffer or a
    /// dropped receiver are removed.
    pub fn emit(&self, event: ChangeEvent) {
        let mut to_remove = Vec::new();

        {
            let listeners = self.listeners.read();
            for (id, sender) in listeners.iter() {
                if sender.try_send(event.clone()).is_err() {
                    to_remove.push(*id);
                }
            }
        }

        if !to_remove.is_empty() {
            let mut listeners = self.listeners.write();
            for id in to_remove {
                listeners.remove(&id);
                warn!(listener = id.0, "dropped change listener");
            }
        }
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_emit_reaches_listener() {
        let notifier = ChangeNotifier::new();
        let listener = notifier.subscribe();

        notifier.emit(ChangeEvent::Evaluations);

        let event = listener.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(event, ChangeEvent::Evaluations);
    }

    #[test]
    fn test_unsubscribed_listener_gets_nothing() {
        let notifier = ChangeNotifier::new();
        let listener = notifier.subscribe();
        notifier.unsubscribe(listener.id);

        notifier.emit(ChangeEvent::FeedStatus);
        assert!(listener.try_recv().is_err());
    }

    #[test]
    fn test_slow_listener_dropped() {
        let notifier = ChangeNotifier::new();
        let _listener = notifier.subscribe_with_buffer(2);

        for _ in 0..5 {
            notifier.emit(ChangeEvent::Metrics(AgentId::from("a")));
        }

        assert_eq!(notifier.listener_count(), 0);
    }

    #[test]
    fn test_disconnected_listener_removed_on_emit() {
        let notifier = ChangeNotifier::new();
        let listener = notifier.subscribe();
        drop(listener);

        notifier.emit(ChangeEvent::Evaluations);
        assert_eq!(notifier.listener_count(), 0);
    }
}
