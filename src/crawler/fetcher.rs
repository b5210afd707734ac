//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with the configured user agent and timeouts
//! - GET requests with bounded retry and exponential backoff
//! - Error classification (transient vs. terminal)
//! - Page retrieval with a Content-Type check

use crate::config::{Config, CrawlerConfig, RetryConfig};
use crate::FetchError;
use reqwest::{header, Client, Response};
use std::time::Duration;
use url::Url;

/// When and how often a GET is retried
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,

    /// Seconds; retry `n` (1-based) waits `backoff_factor * 2^(n-1)`
    pub backoff_factor: f64,

    /// Upper bound on any single delay
    pub backoff_max: Duration,

    /// Statuses treated as transient
    pub retry_statuses: Vec<u16>,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff_factor: config.backoff_factor,
            backoff_max: Duration::from_secs(config.backoff_max_secs),
            retry_statuses: config.retry_statuses.clone(),
        }
    }

    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retry_statuses.contains(&status)
    }

    /// Delay before retry number `retry` (the first retry is 1)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(30) as i32;
        let secs = self.backoff_factor * 2f64.powi(exponent);
        let capped = secs.min(self.backoff_max.as_secs_f64()).max(0.0);
        Duration::from_secs_f64(capped)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// A successfully fetched HTML page
#[derive(Debug, Clone)]
pub struct PageContent {
    /// URL that was requested
    pub url: Url,

    pub status: u16,

    pub body: String,
}

/// Builds an HTTP client with the crawler's identity and timeouts
///
/// Redirects are followed by reqwest's default policy (up to 10 hops).
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// GET with retry, shared by page fetches and image downloads
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | 2xx | Return the response |
/// | Status in the retry set (429, 500, 502, 503, 504) | Retry with backoff |
/// | Connect error / timeout | Retry with backoff |
/// | Any other status | Immediate `FetchError::Status` |
/// | Any other transport error | Immediate `FetchError::Request` |
///
/// A numeric `Retry-After` header on a retryable response replaces the
/// computed delay, capped at `backoff_max`.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    policy: RetryPolicy,
}

impl Fetcher {
    /// Builds a fetcher from the crawl configuration
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = build_http_client(&config.crawler)?;
        Ok(Self::with_client(client, RetryPolicy::from_config(&config.retry)))
    }

    pub fn with_client(client: Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Issues a GET, retrying transient failures
    ///
    /// Only the response head is covered by the retry budget; reading the
    /// body is the caller's business.
    pub async fn get(&self, url: &Url) -> Result<Response, FetchError> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let (reason, retry_after) = match self.client.get(url.clone()).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }

                    if !self.policy.is_retryable_status(status.as_u16()) {
                        return Err(FetchError::Status {
                            url: url.to_string(),
                            status: status.as_u16(),
                        });
                    }

                    (format!("HTTP {}", status.as_u16()), retry_after(&response))
                }
                Err(e) if is_connection_error(&e) => (e.to_string(), None),
                Err(source) => {
                    return Err(FetchError::Request {
                        url: url.to_string(),
                        source,
                    })
                }
            };

            if attempt >= self.policy.max_attempts {
                return Err(FetchError::Transient {
                    url: url.to_string(),
                    attempts: attempt,
                    reason,
                });
            }

            let delay = retry_after
                .map(|d| d.min(self.policy.backoff_max))
                .unwrap_or_else(|| self.policy.delay_for(attempt));

            tracing::debug!(
                "Attempt {}/{} for {} failed ({}), retrying in {:?}",
                attempt,
                self.policy.max_attempts,
                url,
                reason,
                delay
            );

            tokio::time::sleep(delay).await;
        }
    }

    /// Fetches an HTML page
    ///
    /// A response without a Content-Type is assumed to be HTML.
    pub async fn fetch_page(&self, url: &Url) -> Result<PageContent, FetchError> {
        let response = self.get(url).await?;
        let status = response.status().as_u16();

        if let Some(content_type) = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            if !is_html(content_type) {
                return Err(FetchError::NotHtml {
                    url: url.to_string(),
                    content_type: content_type.to_string(),
                });
            }
        }

        let body = response.text().await.map_err(|source| FetchError::Body {
            url: url.to_string(),
            source,
        })?;

        Ok(PageContent {
            url: url.clone(),
            status,
            body,
        })
    }
}

/// Connection-level failures worth retrying
fn is_connection_error(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout()
}

fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_retry_after)
}

/// Parses the delta-seconds form of `Retry-After`; HTTP dates are ignored
fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

fn is_html(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "text/html" || mime == "application/xhtml+xml"
}
