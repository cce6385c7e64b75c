//! Event buffering and dispatch engine
//!
//! [`Tracker`] is the entry point host applications hold on to. It is an
//! explicit context object: clone it into whatever threads or tasks need to
//! track, there is no process-wide instance.
//!
//! ## Lifecycle
//!
//! 1. [`Tracker::new`] builds the session and spawns a single `/health` probe.
//! 2. Until the probe resolves, `track_event` buffers into the Event Queue.
//! 3. Probe says alive: auto-batching starts the periodic flush loop,
//!    otherwise the buffered events go out as one `/batch` and later track
//!    calls are posted to `/track` immediately.
//! 4. Probe says dead: the buffer is discarded and every later event dropped.
//! 5. [`Tracker::shutdown`] stops the loop and makes one bounded final send.
//!
//! Tracking calls never block and never fail. Sends are attempted once;
//! failures are logged and counted, never retried.

mod dispatch;
mod liveness;
mod queue;
mod scheduler;
mod stats;
mod sync;

pub use dispatch::{batched_track_action, track_action, Action};
pub use liveness::{probe, Liveness, LivenessMonitor};
pub use queue::EventQueue;
pub use scheduler::AutoFlush;
pub use stats::TrackerStats;
pub use sync::SyncTracker;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;

use crate::collector::{Batch, Event, HttpTransport, Payload, Transport};
use crate::config::TrackerConfig;
use crate::error::{Error, Result};
use crate::identity::{FileIdentityStore, IdentityStore};
use crate::session::SessionState;

use stats::StatsCounters;

/// Name of the event recorded when a tracker starts
pub const APP_STARTED_EVENT: &str = "app_started";

/// Handle to the event tracker; cheap to clone
#[derive(Clone)]
pub struct Tracker {
    inner: Arc<Inner>,
}

struct Inner {
    config: TrackerConfig,
    session: SessionState,
    transport: Arc<dyn Transport>,
    runtime: Handle,

    liveness: LivenessMonitor,
    /// Publishes a liveness value once its side effects have been applied
    resolved: watch::Sender<Liveness>,
    /// Detached sends still running
    in_flight: watch::Sender<usize>,

    /// Automatic Event Queue
    queue: EventQueue,
    /// Manual Batch Buffer
    manual: EventQueue,

    auto_batching: AtomicBool,
    flush_interval: Mutex<Duration>,
    auto_flush: Mutex<Option<AutoFlush>>,

    closed: AtomicBool,
    stats: StatsCounters,
}

impl Tracker {
    /// Start a tracker.
    ///
    /// Must be called from within a tokio runtime; background work (the
    /// liveness probe, fire-and-forget sends, the flush loop) is spawned on
    /// it. Fails only on invalid configuration or a missing runtime.
    pub fn new(
        config: TrackerConfig,
        transport: Arc<dyn Transport>,
        identity_store: &dyn IdentityStore,
    ) -> Result<Self> {
        if !config.enabled {
            return Err(Error::Config("tracker is disabled".to_string()));
        }
        config.validate()?;

        let runtime = Handle::try_current()
            .map_err(|e| Error::Runtime(format!("no tokio runtime available: {}", e)))?;

        let tenant_id = config
            .tenant_id
            .clone()
            .ok_or_else(|| Error::Config("tracker.tenant_id is required".to_string()))?;

        let session = SessionState::initialize(
            tenant_id,
            config.platform.clone(),
            config.app_version.clone(),
            identity_store,
        );

        let (resolved, _) = watch::channel(Liveness::Unknown);
        let (in_flight, _) = watch::channel(0);

        let inner = Arc::new(Inner {
            auto_batching: AtomicBool::new(config.auto_batching),
            flush_interval: Mutex::new(config.flush_interval()),
            config,
            session,
            transport,
            runtime,
            liveness: LivenessMonitor::new(),
            resolved,
            in_flight,
            queue: EventQueue::new(),
            manual: EventQueue::new(),
            auto_flush: Mutex::new(None),
            closed: AtomicBool::new(false),
            stats: StatsCounters::default(),
        });

        tracing::info!(
            tenant_id = %inner.session.tenant_id(),
            session_id = %inner.session.session_id(),
            platform = %inner.session.platform(),
            app_version = %inner.session.app_version(),
            auto_batching = inner.config.auto_batching,
            "Tracker started"
        );

        let prober = Arc::clone(&inner);
        drop(inner.runtime.spawn(async move {
            prober.run_probe().await;
        }));

        let tracker = Self { inner };
        if tracker.inner.config.track_app_started {
            tracker.track_event(APP_STARTED_EVENT, Payload::None);
        }
        Ok(tracker)
    }

    /// Build a tracker talking HTTP with the identity in the XDG data dir.
    ///
    /// Returns `None` if the tracker is disabled in configuration.
    pub fn from_config(config: &TrackerConfig) -> Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }

        let transport = Arc::new(HttpTransport::new(config)?);
        let store = FileIdentityStore::default_location();
        Self::new(config.clone(), transport, &store).map(Some)
    }

    /// Record an event.
    ///
    /// Depending on liveness and batching mode the event is queued, posted
    /// immediately in the background, or dropped. Never blocks on I/O.
    pub fn track_event(&self, name: impl Into<String>, payload: impl Into<Payload>) {
        let inner = &self.inner;
        let event = inner.session.create_event(name, payload.into().encode());

        // Deciding under the queue lock keeps the decision consistent with a
        // liveness transition or shutdown that drains this queue concurrently.
        let mut queue = inner.queue.lock();
        if inner.is_closed() {
            inner.stats.dropped(1);
            return;
        }
        inner.stats.tracked();

        match track_action(inner.liveness.state(), inner.is_auto_batching()) {
            Action::Enqueue => {
                tracing::trace!(name = %event.name(), "Event queued");
                queue.push(event);
            }
            Action::SendNow => {
                drop(queue);
                inner.send_track_detached(event);
            }
            Action::Drop => {
                drop(queue);
                inner.stats.dropped(1);
                tracing::trace!(name = %event.name(), "Event dropped, collector unreachable");
            }
        }
    }

    /// Record an event into the Manual Batch Buffer.
    ///
    /// Only accepted while the collector is known to be alive; the buffer is
    /// sent by [`Tracker::flush_manual_batch`] or at shutdown.
    pub fn batched_track_event(&self, name: impl Into<String>, payload: impl Into<Payload>) {
        let inner = &self.inner;
        let mut manual = inner.manual.lock();
        if inner.is_closed() {
            inner.stats.dropped(1);
            return;
        }
        inner.stats.tracked();

        match batched_track_action(inner.liveness.state()) {
            Action::Enqueue => {
                manual.push(inner.session.create_event(name, payload.into().encode()));
            }
            Action::SendNow | Action::Drop => {
                drop(manual);
                inner.stats.dropped(1);
                tracing::trace!("Batched event dropped, collector not confirmed alive");
            }
        }
    }

    /// Send the Manual Batch Buffer as one `/batch` request.
    ///
    /// No-op unless the collector is alive and the buffer holds events.
    /// Returns the number of events the collector accepted.
    pub async fn flush_manual_batch(&self) -> usize {
        if !self.inner.liveness.is_alive() {
            return 0;
        }
        let events = self.inner.manual.drain();
        self.inner.send_batch(events).await
    }

    /// Send whatever sits in the Event Queue as one `/batch` request,
    /// without waiting for the next auto-flush tick.
    pub async fn flush(&self) -> usize {
        self.inner.flush_queue().await
    }

    /// Stop background work and make one last bounded send.
    ///
    /// Remaining Event Queue contents join the Manual Batch Buffer; if the
    /// collector is alive, the combined batch is posted once and the call
    /// returns after at most `shutdown_timeout_ms`, whatever the outcome.
    /// Later tracking calls are dropped. Calling it again is a no-op.
    pub async fn shutdown(&self) -> usize {
        let inner = &self.inner;
        if inner.closed.swap(true, Ordering::AcqRel) {
            return 0;
        }
        inner.stop_auto_flush();

        inner.manual.append(inner.queue.drain());
        let events = inner.manual.drain();
        if events.is_empty() {
            tracing::info!("Tracker shut down, nothing pending");
            return 0;
        }

        if !inner.liveness.is_alive() {
            tracing::info!(
                pending = events.len(),
                liveness = %inner.liveness.state(),
                "Tracker shut down, discarding pending events"
            );
            inner.stats.dropped(events.len());
            return 0;
        }

        let timeout = inner.config.shutdown_timeout();
        let pending = events.len();
        match tokio::time::timeout(timeout, inner.send_batch(events)).await {
            Ok(sent) => {
                tracing::info!(sent, "Tracker shut down after final flush");
                sent
            }
            Err(_) => {
                inner.stats.failed();
                tracing::warn!(
                    pending,
                    timeout_ms = timeout.as_millis() as u64,
                    "Final flush timed out, events lost"
                );
                0
            }
        }
    }

    /// Switch batching mode at runtime.
    ///
    /// Enabling while the collector is alive (re)starts the flush loop with
    /// `interval`. Disabling stops the loop and sends what was still queued.
    pub fn set_auto_batching(&self, enabled: bool, interval: Duration) {
        let inner = &self.inner;
        *lock(&inner.flush_interval) = interval;

        // Mode and liveness are read together under the queue lock, the same
        // lock a liveness transition holds while it decides.
        let (alive, pending) = {
            let queue = inner.queue.lock();
            inner.auto_batching.store(enabled, Ordering::Release);
            (inner.liveness.is_alive(), !queue.is_empty())
        };

        if inner.is_closed() {
            return;
        }

        if enabled && alive {
            inner.start_auto_flush();
        } else {
            inner.stop_auto_flush();
            if !enabled && alive && pending {
                let flusher = Arc::clone(inner);
                inner.spawn_send(async move {
                    flusher.flush_queue().await;
                });
            }
        }
    }

    /// Probe the collector again and apply the outcome.
    ///
    /// A transition to dead stops the flush loop and discards the Event
    /// Queue; a transition to alive starts the loop or flushes the queue.
    pub async fn recheck_liveness(&self) -> Liveness {
        if self.inner.is_closed() {
            return self.inner.liveness.state();
        }
        self.inner.run_probe().await
    }

    /// Wait until a probe outcome has been applied, or `timeout` elapses.
    ///
    /// Returns the liveness at that point, which is still `Unknown` on timeout.
    pub async fn wait_for_liveness(&self, timeout: Duration) -> Liveness {
        let mut resolved = self.inner.resolved.subscribe();
        let wait = resolved.wait_for(|liveness| liveness.is_checked());
        let outcome = match tokio::time::timeout(timeout, wait).await {
            Ok(Ok(liveness)) => *liveness,
            _ => self.inner.liveness.state(),
        };
        outcome
    }

    /// Wait until every background send spawned so far has finished, or
    /// `timeout` elapses. Returns `true` if nothing is left in flight.
    pub async fn wait_for_sends(&self, timeout: Duration) -> bool {
        let mut in_flight = self.inner.in_flight.subscribe();
        let idle = matches!(
            tokio::time::timeout(timeout, in_flight.wait_for(|n| *n == 0)).await,
            Ok(Ok(_))
        );
        idle
    }

    /// Background sends not yet finished
    pub fn in_flight_sends(&self) -> usize {
        *self.inner.in_flight.borrow()
    }

    /// Start a new session; events already created keep their session id
    pub fn rotate_session(&self) -> String {
        self.inner.session.rotate_session()
    }

    pub fn liveness(&self) -> Liveness {
        self.inner.liveness.state()
    }

    pub fn session(&self) -> &SessionState {
        &self.inner.session
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.inner.config
    }

    pub fn stats(&self) -> TrackerStats {
        self.inner.stats.snapshot()
    }

    /// Events waiting in the Event Queue
    pub fn pending_count(&self) -> usize {
        self.inner.queue.len()
    }

    /// Events waiting in the Manual Batch Buffer
    pub fn manual_pending_count(&self) -> usize {
        self.inner.manual.len()
    }

    pub fn is_auto_batching(&self) -> bool {
        self.inner.is_auto_batching()
    }

    pub fn is_auto_flush_running(&self) -> bool {
        lock(&self.inner.auto_flush)
            .as_ref()
            .map(AutoFlush::is_running)
            .unwrap_or(false)
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.is_closed()
    }
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("tenant_id", &self.inner.session.tenant_id())
            .field("liveness", &self.inner.liveness.state())
            .field("auto_batching", &self.inner.is_auto_batching())
            .field("pending", &self.inner.queue.len())
            .field("manual_pending", &self.inner.manual.len())
            .finish()
    }
}

impl Inner {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn is_auto_batching(&self) -> bool {
        self.auto_batching.load(Ordering::Acquire)
    }

    async fn run_probe(self: &Arc<Self>) -> Liveness {
        let liveness = probe(self.transport.as_ref(), self.config.probe_timeout()).await;
        self.apply_liveness(liveness).await;
        liveness
    }

    /// Record a probe outcome and trigger what it implies.
    async fn apply_liveness(self: &Arc<Self>, liveness: Liveness) {
        let (previous, auto, to_flush) = {
            let mut queue = self.queue.lock();
            let previous = self.liveness.set(liveness);
            let auto = self.is_auto_batching();
            let to_flush = match liveness {
                Liveness::Alive if !auto => std::mem::take(&mut *queue),
                Liveness::Dead => {
                    let discarded = std::mem::take(&mut *queue);
                    if !discarded.is_empty() {
                        self.stats.dropped(discarded.len());
                        tracing::debug!(count = discarded.len(), "Discarded queued events");
                    }
                    Vec::new()
                }
                _ => Vec::new(),
            };
            (previous, auto, to_flush)
        };

        if previous != liveness {
            tracing::info!(from = %previous, to = %liveness, "Collector liveness changed");
        }

        if !self.is_closed() {
            match liveness {
                Liveness::Alive if auto => self.start_auto_flush(),
                Liveness::Alive => {
                    self.send_batch(to_flush).await;
                }
                Liveness::Dead => self.stop_auto_flush(),
                Liveness::Unknown => {}
            }
        } else {
            self.stats.dropped(to_flush.len());
        }

        self.resolved.send_replace(liveness);
    }

    async fn flush_queue(&self) -> usize {
        if !self.liveness.is_alive() {
            return 0;
        }
        let events = self.queue.drain();
        self.send_batch(events).await
    }

    fn start_auto_flush(self: &Arc<Self>) {
        let interval = *lock(&self.flush_interval);
        let mut slot = lock(&self.auto_flush);
        if !self.is_auto_batching() || self.is_closed() {
            return;
        }

        if let Some(running) = slot.as_ref() {
            if running.is_running() && running.interval() == interval {
                return;
            }
        }

        let weak = Arc::downgrade(self);
        // Replacing the previous handle drops it, which stops its loop.
        *slot = Some(AutoFlush::start(&self.runtime, interval, move || {
            let weak = weak.clone();
            async move {
                if let Some(inner) = weak.upgrade() {
                    inner.flush_queue().await;
                }
            }
        }));
    }

    fn stop_auto_flush(&self) {
        if let Some(running) = lock(&self.auto_flush).take() {
            running.stop();
        }
    }

    /// Post one event in the background; `send_track` logs and counts failures.
    fn send_track_detached(self: &Arc<Self>, event: Event) {
        let sender = Arc::clone(self);
        self.spawn_send(async move {
            let _ = sender.send_track(&event).await;
        });
    }

    /// Spawn a send whose outcome nobody awaits, counted in `in_flight`
    fn spawn_send<F>(self: &Arc<Self>, send: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.in_flight.send_modify(|n| *n += 1);
        let inner = Arc::clone(self);
        drop(self.runtime.spawn(async move {
            send.await;
            inner.in_flight.send_modify(|n| *n = n.saturating_sub(1));
        }));
    }

    async fn send_track(&self, event: &Event) -> bool {
        match self.transport.send_track(event).await {
            Ok(()) => {
                self.stats.sent(1, false);
                true
            }
            Err(e) => {
                self.stats.failed();
                tracing::warn!(name = %event.name(), error = %e, "Failed to send event");
                false
            }
        }
    }

    /// One `/batch` attempt; returns the number of events delivered.
    async fn send_batch(&self, events: Vec<Event>) -> usize {
        if events.is_empty() {
            return 0;
        }

        let batch = Batch::new(events);
        let count = batch.len();
        match self.transport.send_batch(&batch).await {
            Ok(()) => {
                self.stats.sent(count, true);
                tracing::debug!(count, "Published batch");
                count
            }
            Err(e) => {
                self.stats.failed();
                tracing::warn!(count, error = %e, "Failed to publish batch, events lost");
                0
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
