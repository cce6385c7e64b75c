//! Tracking statistics

use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters updated by the tracker from any thread
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    events_tracked: AtomicUsize,
    events_dropped: AtomicUsize,
    events_sent: AtomicUsize,
    batches_sent: AtomicUsize,
    send_failures: AtomicUsize,
}

impl StatsCounters {
    pub(crate) fn tracked(&self) {
        self.events_tracked.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn dropped(&self, count: usize) {
        self.events_dropped.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn sent(&self, events: usize, batch: bool) {
        self.events_sent.fetch_add(events, Ordering::Relaxed);
        if batch {
            self.batches_sent.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn failed(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> TrackerStats {
        TrackerStats {
            events_tracked: self.events_tracked.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            events_sent: self.events_sent.load(Ordering::Relaxed),
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the tracker counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TrackerStats {
    /// Calls to `track_event` / `batched_track_event` while running
    pub events_tracked: usize,
    /// Events discarded by policy (collector dead, manual batch before alive, after shutdown)
    pub events_dropped: usize,
    /// Events delivered with a 2xx answer
    pub events_sent: usize,
    /// `/batch` requests answered 2xx
    pub batches_sent: usize,
    /// Failed `/track` or `/batch` requests
    pub send_failures: usize,
}
