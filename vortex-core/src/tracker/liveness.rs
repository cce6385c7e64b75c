//! Collector liveness
//!
//! Liveness is tri-state and lives in a single atomic byte, so the "checked"
//! view (`state != Unknown`) can never disagree with the value itself.

use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use crate::collector::Transport;
use crate::error::Error;

/// What the tracker currently knows about the collector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// No probe has completed yet
    Unknown,
    /// Last probe got a 2xx from `/health`
    Alive,
    /// Last probe failed, timed out, or got a non-2xx answer
    Dead,
}

impl Liveness {
    pub fn is_checked(self) -> bool {
        self != Liveness::Unknown
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Liveness::Unknown => "unknown",
            Liveness::Alive => "alive",
            Liveness::Dead => "dead",
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            Liveness::Unknown => 0,
            Liveness::Alive => 1,
            Liveness::Dead => 2,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Liveness::Alive,
            2 => Liveness::Dead,
            _ => Liveness::Unknown,
        }
    }
}

impl std::fmt::Display for Liveness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared liveness flag, written by probes and read by every track call
#[derive(Debug, Default)]
pub struct LivenessMonitor {
    state: AtomicU8,
}

impl LivenessMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Liveness {
        Liveness::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_checked(&self) -> bool {
        self.state().is_checked()
    }

    pub fn is_alive(&self) -> bool {
        self.state() == Liveness::Alive
    }

    /// Record a probe outcome, returning the previous state
    pub fn set(&self, liveness: Liveness) -> Liveness {
        Liveness::from_u8(self.state.swap(liveness.to_u8(), Ordering::AcqRel))
    }
}

/// Probe the collector once.
///
/// Bounded by `timeout` even if the transport ignores its own deadline.
/// Never fails: every error is logged and reported as [`Liveness::Dead`].
pub async fn probe(transport: &dyn Transport, timeout: Duration) -> Liveness {
    let outcome = match tokio::time::timeout(timeout, transport.health(timeout)).await {
        Ok(result) => result,
        Err(_) => Err(Error::ProbeFailed(format!(
            "no answer within {}ms",
            timeout.as_millis()
        ))),
    };

    match outcome {
        Ok(()) => Liveness::Alive,
        Err(e) => {
            tracing::warn!(error = %e, "Collector unreachable");
            Liveness::Dead
        }
    }
}
