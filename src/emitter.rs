//! Best-effort event delivery to a single observer.
//!
//! Delivery can fail for reasons the run has no control over (the viewer
//! closed its connection, or was never registered). [`EventSink`] reports
//! those failures; [`Emitter`] is the boundary that discards them so a run
//! never aborts because nobody is listening.

use std::fmt;
use std::sync::Arc;

use crate::app::Event;

/// Identifier assigned to a connected observer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

impl ObserverId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer-{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Undelivered {
    #[error("{0} is not registered")]
    UnknownObserver(ObserverId),
    #[error("{0} has disconnected")]
    Disconnected(ObserverId),
}

/// Somewhere events can be addressed to an observer.
pub trait EventSink: Send + Sync {
    fn deliver(&self, observer: ObserverId, event: Event) -> Result<(), Undelivered>;
}

/// Fire-and-forget handle bound to one observer.
#[derive(Clone)]
pub struct Emitter {
    sink: Arc<dyn EventSink>,
    observer: ObserverId,
}

impl Emitter {
    pub fn new(sink: Arc<dyn EventSink>, observer: ObserverId) -> Self {
        Self { sink, observer }
    }

    pub fn observer(&self) -> ObserverId {
        self.observer
    }

    /// Deliver `event` if possible. Failures are logged at debug level and dropped.
    pub fn emit(&self, event: Event) {
        let kind = event.kind();
        if let Err(e) = self.sink.deliver(self.observer, event) {
            tracing::debug!(observer = %self.observer, event = kind, error = %e, "event dropped");
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Records every event handed to it, optionally refusing delivery.
    #[derive(Default)]
    pub struct RecordingSink {
        pub(super) events: Mutex<Vec<(ObserverId, Event)>>,
        refuse: bool,
    }

    impl RecordingSink {
        /// A sink whose every delivery fails, as if the observer had gone.
        pub fn refusing() -> Self {
            Self {
                refuse: true,
                ..Self::default()
            }
        }

        pub fn events(&self) -> Vec<Event> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .map(|(_, e)| e.clone())
                .collect()
        }

        pub fn attempts(&self) -> usize {
            self.events.lock().unwrap().len()
        }

        pub fn kinds(&self) -> Vec<&'static str> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .map(|(_, e)| e.kind())
                .collect()
        }
    }

    impl EventSink for RecordingSink {
        fn deliver(&self, observer: ObserverId, event: Event) -> Result<(), Undelivered> {
            self.events.lock().unwrap().push((observer, event));
            if self.refuse {
                Err(Undelivered::Disconnected(observer))
            } else {
                Ok(())
            }
        }
    }
}
