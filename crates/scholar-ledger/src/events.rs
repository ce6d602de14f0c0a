//! Delivery of registry events.
//!
//! Sinks are called after an operation has committed, in commit order.
//! A sink cannot fail the operation that produced the event.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use scholar_ledger_core::RegistryEvent;
use tokio::sync::mpsc;

/// Receives events from the registry.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &RegistryEvent);
}

/// In-memory event log, attached to a registry with
/// [`Registry::with_event_sink`](crate::Registry::with_event_sink).
///
/// A bounded log drops its oldest events once full. Consumers that poll
/// the log call [`EventLog::drain`] to take what has accumulated.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<VecDeque<RegistryEvent>>,
    capacity: Option<usize>,
}

impl EventLog {
    /// An unbounded log.
    pub fn new() -> Self {
        Self::default()
    }

    /// A log holding at most `capacity` of the most recent events.
    pub fn bounded(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: Some(capacity),
        }
    }

    fn guard(&self) -> MutexGuard<'_, VecDeque<RegistryEvent>> {
        // Pushes and drains leave the queue whole, so a poisoned lock is still usable.
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Retained events, oldest first.
    pub fn snapshot(&self) -> Vec<RegistryEvent> {
        self.guard().iter().cloned().collect()
    }

    /// Take every retained event, oldest first, leaving the log empty.
    pub fn drain(&self) -> Vec<RegistryEvent> {
        self.guard().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }
}

impl EventSink for EventLog {
    fn emit(&self, event: &RegistryEvent) {
        let mut events = self.guard();
        if let Some(capacity) = self.capacity {
            if capacity == 0 {
                return;
            }
            while events.len() >= capacity {
                events.pop_front();
            }
        }
        events.push_back(event.clone());
    }
}

/// Forwards events to an async consumer, such as an off-core indexer.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<RegistryEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiver its events arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RegistryEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: &RegistryEvent) {
        if self.tx.send(event.clone()).is_err() {
            tracing::warn!(event = event.name(), "event receiver dropped");
        }
    }
}
