//! Synchronous wrapper for hosts without an async runtime

use std::sync::Arc;
use std::time::Duration;

use crate::collector::{Payload, Transport};
use crate::config::TrackerConfig;
use crate::error::{Error, Result};
use crate::identity::IdentityStore;

use super::{Liveness, Tracker, TrackerStats};

/// Tracker that owns its own tokio runtime
///
/// Tracking calls stay non-blocking; flushes and shutdown block the calling
/// thread. Call [`SyncTracker::shutdown`] before exiting, otherwise whatever
/// is still queued is lost with the runtime.
pub struct SyncTracker {
    inner: Tracker,
    runtime: tokio::runtime::Runtime,
}

impl SyncTracker {
    /// Create a tracker with a dedicated background runtime
    pub fn new(
        config: TrackerConfig,
        transport: Arc<dyn Transport>,
        identity_store: &dyn IdentityStore,
    ) -> Result<Self> {
        let runtime = build_runtime()?;
        let inner = {
            let _guard = runtime.enter();
            Tracker::new(config, transport, identity_store)?
        };
        Ok(Self { inner, runtime })
    }

    /// Create an HTTP tracker from configuration
    ///
    /// Returns None if the tracker is disabled.
    pub fn from_config(config: &TrackerConfig) -> Result<Option<Self>> {
        let runtime = build_runtime()?;
        let inner = {
            let _guard = runtime.enter();
            Tracker::from_config(config)?
        };
        Ok(inner.map(|inner| Self { inner, runtime }))
    }

    pub fn track_event(&self, name: impl Into<String>, payload: impl Into<Payload>) {
        self.inner.track_event(name, payload);
    }

    pub fn batched_track_event(&self, name: impl Into<String>, payload: impl Into<Payload>) {
        self.inner.batched_track_event(name, payload);
    }

    /// Send the Manual Batch Buffer (blocking)
    pub fn flush_manual_batch(&self) -> usize {
        self.runtime.block_on(self.inner.flush_manual_batch())
    }

    /// Send the Event Queue (blocking)
    pub fn flush(&self) -> usize {
        self.runtime.block_on(self.inner.flush())
    }

    /// Block until the startup probe resolves or `timeout` elapses
    pub fn wait_for_liveness(&self, timeout: Duration) -> Liveness {
        self.runtime.block_on(self.inner.wait_for_liveness(timeout))
    }

    /// Block until background sends have finished or `timeout` elapses
    pub fn wait_for_sends(&self, timeout: Duration) -> bool {
        self.runtime.block_on(self.inner.wait_for_sends(timeout))
    }

    /// Final bounded flush, then tear down the runtime (blocking)
    pub fn shutdown(self) -> usize {
        let sent = self.runtime.block_on(self.inner.shutdown());
        self.runtime.shutdown_background();
        sent
    }

    pub fn rotate_session(&self) -> String {
        self.inner.rotate_session()
    }

    pub fn liveness(&self) -> Liveness {
        self.inner.liveness()
    }

    pub fn stats(&self) -> TrackerStats {
        self.inner.stats()
    }

    pub fn pending_count(&self) -> usize {
        self.inner.pending_count()
    }

    /// Async handle sharing this tracker's state
    pub fn tracker(&self) -> &Tracker {
        &self.inner
    }
}

fn build_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("vortex-tracker")
        .enable_all()
        .build()
        .map_err(|e| Error::Runtime(format!("failed to create runtime: {}", e)))
}
