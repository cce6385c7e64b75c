//! Error types for vortex-core

use thiserror::Error;

/// Main error type for the vortex-core library
///
/// Only [`Error::Config`] and [`Error::Runtime`] ever reach callers of the
/// tracker, and only at construction. The remaining variants are produced by
/// collaborators and absorbed by the engine, which logs them and moves on.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Persistent identity could not be read or written
    #[error("identity unavailable: {0}")]
    IdentityUnavailable(String),

    /// Health probe failed or timed out
    #[error("liveness probe failed: {0}")]
    ProbeFailed(String),

    /// Track or batch POST failed
    #[error("send failed: {0}")]
    SendFailed(String),

    /// No async runtime available to schedule background work
    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Result type alias for vortex-core
pub type Result<T> = std::result::Result<T, Error>;
