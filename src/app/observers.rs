use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::app::Event;
use crate::emitter::{EventSink, ObserverId, Undelivered};

/// Concurrent registry of connected observers keyed by [`ObserverId`].
///
/// Each entry holds the sending half of the observer's outbound queue; the
/// connection's writer task owns the receiving half.
#[derive(Default)]
pub struct ObserverRegistry {
    next_id: AtomicU64,
    observers: DashMap<ObserverId, mpsc::UnboundedSender<Event>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly connected observer.
    pub fn register(&self) -> (ObserverId, mpsc::UnboundedReceiver<Event>) {
        let id = ObserverId::new(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let (tx, rx) = mpsc::unbounded_channel();
        self.observers.insert(id, tx);
        (id, rx)
    }

    /// Remove an observer, typically on connection teardown. Dropping the
    /// sender lets the writer task finish.
    pub fn remove(&self, id: &ObserverId) {
        self.observers.remove(id);
    }

    pub fn is_connected(&self, id: &ObserverId) -> bool {
        self.observers.get(id).is_some_and(|tx| !tx.is_closed())
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }
}

impl EventSink for ObserverRegistry {
    fn deliver(&self, observer: ObserverId, event: Event) -> Result<(), Undelivered> {
        let Some(tx) = self.observers.get(&observer).map(|tx| tx.clone()) else {
            return Err(Undelivered::UnknownObserver(observer));
        };
        if tx.send(event).is_err() {
            self.observers.remove_if(&observer, |_, tx| tx.is_closed());
            return Err(Undelivered::Disconnected(observer));
        }
        Ok(())
    }
}
