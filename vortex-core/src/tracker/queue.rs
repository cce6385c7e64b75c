//! Pending-event queues
//!
//! Both the automatic Event Queue and the Manual Batch Buffer are instances of
//! [`EventQueue`]. Appends and drains are serialized by one mutex per queue, so
//! an event enqueued concurrently with a drain lands either in the drained
//! batch or in the fresh buffer, never in both and never in neither.
//!
//! Queues are unbounded: a collector whose liveness stays unknown lets the
//! Event Queue grow with every tracked event.

use std::sync::{Mutex, MutexGuard};

use crate::collector::Event;

/// Insertion-ordered, thread-safe event buffer
#[derive(Debug, Default)]
pub struct EventQueue {
    events: Mutex<Vec<Event>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one event
    pub fn enqueue(&self, event: Event) {
        self.lock().push(event);
    }

    /// Append many events, preserving their order
    pub fn append(&self, mut events: Vec<Event>) {
        if events.is_empty() {
            return;
        }
        self.lock().append(&mut events);
    }

    /// Swap the contents for an empty buffer and return what was there
    pub fn drain(&self) -> Vec<Event> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Exclusive access, for callers that must make a decision and an append
    /// atomic with respect to drains
    pub(crate) fn lock(&self) -> MutexGuard<'_, Vec<Event>> {
        // a poisoned Vec is still well-formed
        match self.events.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::MemoryIdentityStore;
    use crate::session::SessionState;
    use std::sync::Arc;

    fn make_session() -> SessionState {
        SessionState::initialize(
            "alpha",
            "linux",
            "1.0.0",
            &MemoryIdentityStore::with_identity("device-1"),
        )
    }

    #[test]
    fn test_drain_preserves_order_and_empties() {
        let session = make_session();
        let queue = EventQueue::new();
        for name in ["a", "b", "c"] {
            queue.enqueue(session.create_event(name, String::new()));
        }

        let drained = queue.drain();
        let names: Vec<_> = drained.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(queue.is_empty());
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn test_append_after_existing() {
        let session = make_session();
        let queue = EventQueue::new();
        queue.enqueue(session.create_event("first", String::new()));
        queue.append(vec![
            session.create_event("second", String::new()),
            session.create_event("third", String::new()),
        ]);

        let names: Vec<_> = queue.drain().into_iter().map(|e| e.tracking.name).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_concurrent_enqueue_and_drain_loses_nothing() {
        const WRITERS: usize = 8;
        const PER_WRITER: usize = 500;

        let session = Arc::new(make_session());
        let queue = Arc::new(EventQueue::new());

        let writers: Vec<_> = (0..WRITERS)
            .map(|w| {
                let queue = Arc::clone(&queue);
                let session = Arc::clone(&session);
                std::thread::spawn(move || {
                    for i in 0..PER_WRITER {
                        queue.enqueue(session.create_event(format!("{w}-{i}"), String::new()));
                    }
                })
            })
            .collect();

        let drainer = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || {
                let mut seen = Vec::new();
                for _ in 0..200 {
                    seen.extend(queue.drain());
                    std::thread::yield_now();
                }
                seen
            })
        };

        for writer in writers {
            writer.join().unwrap();
        }
        let mut seen = drainer.join().unwrap();
        seen.extend(queue.drain());

        assert_eq!(seen.len(), WRITERS * PER_WRITER);
        let mut names: Vec<_> = seen.into_iter().map(|e| e.tracking.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), WRITERS * PER_WRITER);
    }
}
