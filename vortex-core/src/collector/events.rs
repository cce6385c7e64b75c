//! Wire types for the Vortex collector API
//!
//! ```text
//! POST /track   { "tenant_id": "...", "tracking": { "name": ..., ... } }
//! POST /batch   { "tracks": [ <same shape as the /track body>, ... ] }
//! ```
//!
//! An [`Event`] is built once, at the moment the host tracks it, and never
//! mutated afterwards. Whatever queue holds it owns it until it is handed to
//! the transport, after which it is dropped regardless of the send outcome.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single tracked event, as posted to `/track`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Tenant the event is scoped to on the collector
    pub tenant_id: String,

    /// Event body
    pub tracking: TrackingData,
}

/// Event body nested under `tracking`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingData {
    pub name: String,

    /// Pre-serialized payload, empty when the event carries none
    pub value: String,

    /// Stable per-installation identifier
    pub identity: String,

    pub session_id: String,
    pub platform: String,
    pub app_version: String,

    /// Creation time, serialized as RFC 3339 in UTC
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn name(&self) -> &str {
        &self.tracking.name
    }

    pub fn session_id(&self) -> &str {
        &self.tracking.session_id
    }
}

/// Body of a `/batch` request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub tracks: Vec<Event>,
}

impl Batch {
    pub fn new(tracks: Vec<Event>) -> Self {
        Self { tracks }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Payload handed to the tracker alongside an event name
///
/// Everything ends up as the `value` string of the event.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Payload {
    /// No payload, encodes to an empty string
    #[default]
    None,

    /// Already serialized, used verbatim
    Raw(String),

    /// Plain text, wrapped as `{"data": "<text>"}`
    Text(String),

    /// Structured properties, serialized as JSON
    Props(serde_json::Value),
}

impl Payload {
    /// Encode into the event `value` string
    pub fn encode(self) -> String {
        match self {
            Payload::None => String::new(),
            Payload::Raw(raw) => raw,
            Payload::Text(text) if text.is_empty() => String::new(),
            Payload::Text(text) => serde_json::json!({ "data": text }).to_string(),
            Payload::Props(value) => value.to_string(),
        }
    }
}

impl From<&str> for Payload {
    fn from(raw: &str) -> Self {
        Payload::Raw(raw.to_string())
    }
}

impl From<String> for Payload {
    fn from(raw: String) -> Self {
        Payload::Raw(raw)
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Payload::Props(value)
    }
}

impl From<HashMap<String, String>> for Payload {
    fn from(map: HashMap<String, String>) -> Self {
        let object = map
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::String(v)))
            .collect::<serde_json::Map<_, _>>();
        Payload::Props(serde_json::Value::Object(object))
    }
}

impl From<Option<String>> for Payload {
    fn from(raw: Option<String>) -> Self {
        raw.map(Payload::Raw).unwrap_or_default()
    }
}
