//! Upstream odds feed client
//!
//! `FeedSource` is the seam the synchronized fetcher retries over; the HTTP
//! implementation is the production one.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

use super::error::FetchError;
use super::schema::{
    validate_mappings_response, validate_state_response, MappingsResponse, StateResponse,
    MAPPINGS_ENDPOINT, STATE_ENDPOINT,
};

/// Source of the two upstream payloads
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_state(&self) -> Result<StateResponse, FetchError>;
    async fn fetch_mappings(&self) -> Result<MappingsResponse, FetchError>;
}

/// reqwest-backed feed client with connection pooling
#[derive(Clone)]
pub struct HttpFeedClient {
    client: Client,
    base_url: String,
}

impl HttpFeedClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        use anyhow::Context;

        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .context("Failed to build HttpFeedClient")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    #[inline]
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json(&self, endpoint: &'static str) -> Result<Value, FetchError> {
        let resp = self
            .client
            .get(self.url(endpoint))
            .send()
            .await
            .map_err(|e| FetchError::transport(endpoint, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                endpoint,
                status: status.as_u16(),
            });
        }

        resp.json::<Value>().await.map_err(|e| FetchError::Shape {
            endpoint,
            reason: format!("body is not JSON: {e}"),
        })
    }
}

#[async_trait]
impl FeedSource for HttpFeedClient {
    async fn fetch_state(&self) -> Result<StateResponse, FetchError> {
        let result = self
            .get_json(STATE_ENDPOINT)
            .await
            .and_then(|body| validate_state_response(&body));

        if let Err(e) = &result {
            warn!(endpoint = STATE_ENDPOINT, error = %e, "[API ERROR] Failed to fetch state");
        }
        result
    }

    async fn fetch_mappings(&self) -> Result<MappingsResponse, FetchError> {
        let result = self
            .get_json(MAPPINGS_ENDPOINT)
            .await
            .and_then(|body| validate_mappings_response(&body));

        if let Err(e) = &result {
            warn!(endpoint = MAPPINGS_ENDPOINT, error = %e, "[API ERROR] Failed to fetch mappings");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation_normalizes_base_url() {
        let client = HttpFeedClient::new("http://localhost:3000/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:3000");
        assert_eq!(client.url(STATE_ENDPOINT), "http://localhost:3000/api/state");
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_transport_error() {
        // Port 9 (discard) is not expected to have an HTTP server behind it.
        let client = HttpFeedClient::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let err = client.fetch_state().await.unwrap_err();
        assert!(matches!(
            err,
            FetchError::Transport { endpoint: STATE_ENDPOINT, .. }
        ));
    }
}
