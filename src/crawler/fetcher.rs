//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the configured user agent and timeout
//! - GET requests to fetch page content
//! - Retry logic for transient failures
//! - Error classification

use crate::config::CrawlerConfig;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;

/// Maximum redirect hops followed per request
const MAX_REDIRECTS: usize = 10;

/// A successfully fetched response
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// Final URL after redirects
    pub final_url: String,
    /// HTTP status code
    pub status_code: u16,
    /// Content-Type header value
    pub content_type: Option<String>,
    /// Response body
    pub body: String,
}

/// Errors returned once the retry policy is exhausted
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status_code} for {url}")]
    Status { url: String, status_code: u16 },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection failed for {url}: {message}")]
    Connect { url: String, message: String },

    #[error("Request failed for {url}: {message}")]
    Transport { url: String, message: String },
}

impl FetchError {
    /// True for failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Status { status_code, .. } => *status_code >= 500,
            FetchError::Timeout { .. } | FetchError::Connect { .. } => true,
            FetchError::Transport { .. } => true,
        }
    }
}

/// Retrieves a page by URL
///
/// Implementations own their retry and timeout policy; the coordinator
/// treats any `Err` as a final failure for that URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use yoink::config::CrawlerConfig;
/// use yoink::crawler::build_http_client;
///
/// let client = build_http_client(&CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.timeout_secs.min(10)))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetcher backed by `reqwest` with exponential backoff
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | HTTP 2xx | Success |
/// | HTTP 4xx | Immediate failure |
/// | HTTP 5xx | Retry |
/// | Timeout | Retry |
/// | Connection error | Retry |
///
/// Attempt `n` (0-based) that fails with a retryable error waits
/// `backoff * 2^n` before the next attempt.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    max_attempts: u32,
    backoff: Duration,
}

impl HttpFetcher {
    pub fn new(config: &CrawlerConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
            max_attempts: config.max_retries.max(1),
            backoff: Duration::from_secs(1),
        })
    }

    /// Overrides the base backoff delay
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    async fn attempt(&self, url: &str) -> Result<FetchResponse, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status_code: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.text().await.map_err(|e| classify_error(url, e))?;

        Ok(FetchResponse {
            final_url,
            status_code: status.as_u16(),
            content_type,
            body,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
        let mut attempt = 0;
        loop {
            match self.attempt(url).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt + 1 < self.max_attempts => {
                    let delay = self.backoff * 2u32.saturating_pow(attempt);
                    tracing::debug!(
                        "Attempt {}/{} failed: {}; retrying in {:?}",
                        attempt + 1,
                        self.max_attempts,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn classify_error(url: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if e.is_connect() {
        FetchError::Connect {
            url: url.to_string(),
            message: e.to_string(),
        }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}
