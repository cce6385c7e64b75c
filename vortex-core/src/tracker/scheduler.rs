//! Cancellable periodic task driving automatic flushes
//!
//! The loop waits on a biased `select!` between the stop signal and the next
//! tick, so once [`AutoFlush::stop`] has been called no further tick starts.
//! A tick already running when stop is requested is allowed to finish.

use std::future::Future;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Handle to a running periodic flush loop; stops the loop when dropped
#[derive(Debug)]
pub struct AutoFlush {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
    interval: Duration,
}

impl AutoFlush {
    /// Spawn the loop on `runtime`. The first tick fires one `interval` after
    /// start, then every `interval`; ticks never overlap.
    pub fn start<F, Fut>(runtime: &Handle, interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (stop, mut stopped) = watch::channel(false);

        let task = runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = stopped.changed() => break,
                    _ = ticker.tick() => {
                        if *stopped.borrow() {
                            break;
                        }
                        tick().await;
                    }
                }
            }
            tracing::debug!("Auto-flush loop stopped");
        });

        tracing::debug!(interval_ms = interval.as_millis() as u64, "Auto-flush loop started");
        Self {
            stop,
            task,
            interval,
        }
    }

    /// Request cancellation; no tick starts after this returns
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }

    pub fn is_running(&self) -> bool {
        !*self.stop.borrow() && !self.task.is_finished()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Drop for AutoFlush {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_loop(interval: Duration) -> (AutoFlush, Arc<AtomicUsize>) {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let flush = AutoFlush::start(&Handle::current(), interval, move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        (flush, ticks)
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_once_per_interval() {
        let (flush, ticks) = counting_loop(Duration::from_secs(10));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert!(flush.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_tick_after_stop() {
        let (flush, ticks) = counting_loop(Duration::from_secs(10));

        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        flush.stop();
        assert!(!flush.is_running());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_loop() {
        let (flush, ticks) = counting_loop(Duration::from_secs(1));
        drop(flush);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);
    }
}
