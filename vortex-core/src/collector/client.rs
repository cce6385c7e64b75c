//! HTTP transport for the Vortex collector API
//!
//! The engine talks to the collector only through the [`Transport`] trait, so
//! hosts with their own HTTP stack (and tests) can swap the implementation.
//! [`HttpTransport`] is the `reqwest` backed default.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::Serialize;

use crate::config::TrackerConfig;
use crate::error::{Error, Result};

use super::events::{Batch, Event};

/// Asynchronous connection to the collector
///
/// Every method makes exactly one attempt. Callers decide what a failure
/// means; the tracker logs it and drops the payload.
#[async_trait]
pub trait Transport: Send + Sync {
    /// `GET /health`, `Ok` only for a 2xx answer within `timeout`
    async fn health(&self, timeout: Duration) -> Result<()>;

    /// `POST /track` with a single event
    async fn send_track(&self, event: &Event) -> Result<()>;

    /// `POST /batch` with every event of the batch
    async fn send_batch(&self, batch: &Batch) -> Result<()>;
}

/// HTTP client for the Vortex collector
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport from configuration
    ///
    /// Returns an error if the configuration is invalid or missing required fields.
    pub fn new(config: &TrackerConfig) -> Result<Self> {
        config.validate()?;

        let base_url = config
            .normalized_base_url()
            .ok_or_else(|| Error::Config("tracker.base_url is required".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<T: Serialize + ?Sized>(&self, endpoint: &str, body: &T) -> Result<()> {
        let url = format!("{}{}", self.base_url, endpoint);

        let response = self
            .http_client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::SendFailed(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            Err(Error::SendFailed(format!(
                "API error ({}): {}",
                status, error_text
            )))
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn health(&self, timeout: Duration) -> Result<()> {
        let url = format!("{}/health", self.base_url);

        let response = self
            .http_client
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Error::ProbeFailed(format!("HTTP request failed: {}", e)))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Error::ProbeFailed(format!(
                "health returned {}",
                response.status()
            )))
        }
    }

    async fn send_track(&self, event: &Event) -> Result<()> {
        self.post("/track", event).await
    }

    async fn send_batch(&self, batch: &Batch) -> Result<()> {
        self.post("/batch", batch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_requires_valid_config() {
        let config = TrackerConfig::default();
        assert!(HttpTransport::new(&config).is_err());
    }

    #[test]
    fn test_transport_strips_trailing_slash() {
        let config = TrackerConfig::new("alpha", "https://in.example.com/");
        let transport = HttpTransport::new(&config).unwrap();
        assert_eq!(transport.base_url(), "https://in.example.com");
    }

    #[tokio::test]
    async fn test_unreachable_collector_fails_probe() {
        // nothing listens on the discard port
        let config = TrackerConfig::new("alpha", "http://127.0.0.1:9");
        let transport = HttpTransport::new(&config).unwrap();

        let result = transport.health(Duration::from_millis(500)).await;
        assert!(matches!(result, Err(Error::ProbeFailed(_))));
    }
}
