//! Shared helpers for tracker integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use vortex_core::{Batch, Error, Event, Result, TrackerConfig, Transport};

/// In-memory collector that records every request it receives
pub struct RecordingTransport {
    alive: AtomicBool,
    release: watch::Sender<bool>,
    fail_sends: AtomicBool,
    hang_sends: AtomicBool,
    probes: AtomicUsize,
    tracks: Mutex<Vec<Event>>,
    batches: Mutex<Vec<Batch>>,
}

impl RecordingTransport {
    fn build(alive: bool, released: bool) -> Arc<Self> {
        let (release, _) = watch::channel(released);
        Arc::new(Self {
            alive: AtomicBool::new(alive),
            release,
            fail_sends: AtomicBool::new(false),
            hang_sends: AtomicBool::new(false),
            probes: AtomicUsize::new(0),
            tracks: Mutex::new(Vec::new()),
            batches: Mutex::new(Vec::new()),
        })
    }

    /// Health answers 2xx right away
    pub fn alive() -> Arc<Self> {
        Self::build(true, true)
    }

    /// Health fails right away
    pub fn dead() -> Arc<Self> {
        Self::build(false, true)
    }

    /// Health blocks until [`RecordingTransport::release`] is called
    pub fn gated(alive: bool) -> Arc<Self> {
        Self::build(alive, false)
    }

    pub fn release(&self) {
        self.release.send_replace(true);
    }

    pub fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::SeqCst);
    }

    pub fn fail_sends(&self) {
        self.fail_sends.store(true, Ordering::SeqCst);
    }

    pub fn hang_sends(&self) {
        self.hang_sends.store(true, Ordering::SeqCst);
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn tracks(&self) -> Vec<Event> {
        self.tracks.lock().unwrap().clone()
    }

    pub fn batches(&self) -> Vec<Batch> {
        self.batches.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.tracks.lock().unwrap().len() + self.batches.lock().unwrap().len()
    }

    async fn outcome(&self) -> Result<()> {
        if self.hang_sends.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(Error::SendFailed("API error (503): unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn health(&self, _timeout: Duration) -> Result<()> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        let mut released = self.release.subscribe();
        let _ = released.wait_for(|open| *open).await;

        if self.alive.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::ProbeFailed("connection refused".to_string()))
        }
    }

    async fn send_track(&self, event: &Event) -> Result<()> {
        self.tracks.lock().unwrap().push(event.clone());
        self.outcome().await
    }

    async fn send_batch(&self, batch: &Batch) -> Result<()> {
        self.batches.lock().unwrap().push(batch.clone());
        self.outcome().await
    }
}

/// Tracker config without the automatic `app_started` event
pub fn test_config(auto_batching: bool) -> TrackerConfig {
    TrackerConfig {
        auto_batching,
        track_app_started: false,
        ..TrackerConfig::new("alpha", "http://collector.test/")
    }
}

/// Names of the events in a batch, in order
pub fn names(batch: &Batch) -> Vec<String> {
    batch.tracks.iter().map(|e| e.tracking.name.clone()).collect()
}

/// Poll `condition` until it holds or two seconds pass
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
