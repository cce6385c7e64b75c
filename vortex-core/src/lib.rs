//! # vortex-core
//!
//! Client-side event tracking for the Vortex analytics collector.
//!
//! This library provides:
//! - An event buffering and dispatch engine ([`Tracker`])
//! - The collector wire types and an HTTP transport
//! - Persistent installation identity and per-process session state
//! - Configuration management and logging infrastructure
//!
//! ## Guarantees
//!
//! Telemetry never gets in the host's way: tracking calls do not block, do
//! not fail, and do not panic. Delivery is at-most-once and best-effort; a
//! failed send is logged and dropped. Only shutdown waits, and only for the
//! configured drain timeout.
//!
//! ## Example
//!
//! ```rust,no_run
//! use vortex_core::{Config, Tracker};
//!
//! #[tokio::main]
//! async fn main() -> vortex_core::Result<()> {
//!     let config = Config::load()?;
//!     if let Some(tracker) = Tracker::from_config(&config.tracker)? {
//!         tracker.track_event("level_completed", serde_json::json!({ "level": 3 }));
//!         tracker.shutdown().await;
//!     }
//!     Ok(())
//! }
//! ```

// Re-export commonly used items at the crate root
pub use collector::{Batch, Event, HttpTransport, Payload, Transport};
pub use config::{Config, TrackerConfig};
pub use error::{Error, Result};
pub use identity::{FileIdentityStore, IdentityStore, MemoryIdentityStore};
pub use session::SessionState;
pub use tracker::{Liveness, SyncTracker, Tracker, TrackerStats};

// Public modules
pub mod collector;
pub mod config;
pub mod error;
pub mod identity;
pub mod logging;
pub mod session;
pub mod tracker;
