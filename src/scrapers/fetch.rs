//! HTTP fetching shared by the listing discoverer and the post scraper.
//!
//! Requests are made one at a time with a fixed timeout. Any failure, be
//! it transport, timeout or non-2xx status, surfaces as a [`FetchError`];
//! callers log it and carry on with "no data" for that page.

use crate::config::SiteConfig;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, instrument, warn};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} for {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
}

/// Thin wrapper over a configured [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: reqwest::Client,
}

impl PageFetcher {
    /// Build a client carrying the configured user agent and timeout.
    pub fn new(config: &SiteConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self { client })
    }

    /// GET `url` and return the body text.
    #[instrument(level = "debug", skip(self))]
    pub async fn fetch_html(&self, url: &str) -> Result<String, FetchError> {
        let t0 = Instant::now();
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }
        let body = response.text().await?;
        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched page"
        );
        Ok(body)
    }

    /// Like [`fetch_html`](Self::fetch_html), but logs the failure and
    /// returns `None`.
    pub async fn fetch_html_or_warn(&self, url: &str) -> Option<String> {
        match self.fetch_html(url).await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!(%url, error = %e, "Failed request");
                None
            }
        }
    }
}
