//! Vortex collector protocol
//!
//! This module holds the wire types and the transport used to reach the
//! collector:
//!
//! - `GET /health` answers 2xx while the collector accepts events
//! - `POST /track` ingests a single event
//! - `POST /batch` ingests a list of events
//!
//! Nothing here buffers or retries; that policy lives in [`crate::tracker`].

mod client;
mod events;

pub use client::{HttpTransport, Transport};
pub use events::{Batch, Event, Payload, TrackingData};
