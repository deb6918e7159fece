//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with the configured user agent and headers
//! - GET requests for catalog pages with a per-request timeout
//! - Error classification into transient and permanent failures
//!
//! The fetcher never retries; retry policy belongs to the scheduler.

use crate::config::Config;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// A single catalog page to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Absolute URL of the page
    pub url: String,

    /// 1-based position of the page in the catalog
    pub page_index: u32,
}

/// Classified fetch failure
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Likely to succeed on an immediate retry (timeout, 5xx, 429, connection reset)
    #[error("transient failure fetching {url}: {reason}")]
    Transient { url: String, reason: String },

    /// Retrying will not help (4xx, malformed URL)
    #[error("permanent failure fetching {url}: {reason}")]
    Permanent { url: String, reason: String },
}

impl FetchError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    pub fn reason(&self) -> &str {
        match self {
            Self::Transient { reason, .. } | Self::Permanent { reason, .. } => reason,
        }
    }
}

/// Result of a fetch operation
#[derive(Debug)]
pub struct FetchResult {
    /// The request this result answers
    pub request: PageRequest,

    /// Page body on success, classified error otherwise
    pub response: Result<String, FetchError>,
}

/// Builds an HTTP client with the configured user agent and default headers
///
/// # Arguments
///
/// * `config` - The crawl configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &Config) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    for (name, value) in &config.site.headers {
        // Validation already rejected malformed headers
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            headers.insert(name, value);
        }
    }

    Client::builder()
        .user_agent(config.user_agent.value.clone())
        .default_headers(headers)
        .connect_timeout(Duration::from_secs(10).min(config.crawler.timeout()))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Thin wrapper around the HTTP client used by the crawl workers
#[derive(Debug, Clone)]
pub struct FetchClient {
    client: Client,
}

impl FetchClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a client from the crawl configuration
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(config)?))
    }

    /// Fetches one page
    ///
    /// # Classification
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | HTTP 2xx | body |
    /// | HTTP 429 | Transient |
    /// | HTTP 5xx | Transient |
    /// | Other HTTP status | Permanent |
    /// | Timeout | Transient |
    /// | Connection refused / reset | Transient |
    /// | Body read failure | Transient |
    /// | Malformed URL, redirect error | Permanent |
    pub async fn fetch(&self, request: PageRequest, timeout: Duration) -> FetchResult {
        let response = self.get(&request.url, timeout).await;
        FetchResult { request, response }
    }

    async fn get(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_request_error(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(url, status));
        }

        response.text().await.map_err(|e| FetchError::Transient {
            url: url.to_string(),
            reason: format!("failed to read body: {}", e),
        })
    }
}

/// Maps a non-success HTTP status to a fetch error
pub fn classify_status(url: &str, status: StatusCode) -> FetchError {
    let reason = format!("HTTP {}", status.as_u16());

    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        FetchError::Transient {
            url: url.to_string(),
            reason,
        }
    } else {
        FetchError::Permanent {
            url: url.to_string(),
            reason,
        }
    }
}

/// Maps a transport-level error to a fetch error
fn classify_request_error(url: &str, error: &reqwest::Error) -> FetchError {
    if error.is_builder() || error.is_redirect() {
        FetchError::Permanent {
            url: url.to_string(),
            reason: error.to_string(),
        }
    } else if error.is_timeout() {
        FetchError::Transient {
            url: url.to_string(),
            reason: "request timeout".to_string(),
        }
    } else if error.is_connect() {
        FetchError::Transient {
            url: url.to_string(),
            reason: "connection failed".to_string(),
        }
    } else {
        FetchError::Transient {
            url: url.to_string(),
            reason: error.to_string(),
        }
    }
}
