//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - Classifying transport failures into transient and terminal kinds
//! - Retrying transient failures under a [`TransientRetry`] policy
//!
//! # Outcome Classification
//!
//! | Condition | Outcome |
//! |-----------|---------|
//! | HTTP 2xx | Content |
//! | HTTP 404 / 410 | NotFound, immediately |
//! | HTTP 5xx | Wait, retry |
//! | Timeout | Wait, retry |
//! | Connect / DNS failure | Wait, retry |
//! | Connection reset | Wait, retry |
//! | Other HTTP 4xx | Failure, immediately |
//! | Anything else | Failure, immediately |

use crate::config::UserAgentConfig;
use crate::crawler::retry::TransientRetry;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::error::Error as StdError;
use std::io::ErrorKind;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Why a single request did not produce a body
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("connection reset: {0}")]
    Reset(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Whether waiting and repeating the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Connect(_) | Self::Reset(_) => true,
            Self::Status(code) => *code >= 500,
            Self::Other(_) => false,
        }
    }

    /// Whether the server said the resource does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status(404) | Self::Status(410))
    }
}

/// Issues one GET request and returns the body
///
/// Implementations must map non-success statuses to
/// [`TransportError::Status`] rather than returning the body.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &Url) -> Result<String, TransportError>;
}

/// Terminal result of a resilient fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Successful response body
    Content(String),

    /// The resource does not exist
    NotFound,

    /// The resource could not be fetched and retrying the request will not help
    Failure(String),
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Per-request timeout
///
/// # Example
///
/// ```no_run
/// use roster_crawl::config::UserAgentConfig;
/// use roster_crawl::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "RosterCrawl".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// `reqwest`-backed transport
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &UserAgentConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config, timeout)?,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &Url) -> Result<String, TransportError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(classify_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        response.text().await.map_err(classify_error)
    }
}

/// Maps a reqwest error onto the transport taxonomy
fn classify_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        return TransportError::Timeout;
    }

    // Name resolution failures surface as connect errors too.
    if error.is_connect() {
        return TransportError::Connect(error.to_string());
    }

    if is_connection_reset(&error) {
        return TransportError::Reset(error.to_string());
    }

    if let Some(status) = error.status() {
        return TransportError::Status(status.as_u16());
    }

    TransportError::Other(error.to_string())
}

/// Walks the source chain looking for a dropped connection
fn is_connection_reset(error: &reqwest::Error) -> bool {
    let mut source: Option<&(dyn StdError + 'static)> = error.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::BrokenPipe
                    | ErrorKind::UnexpectedEof
            ) {
                return true;
            }
        }
        source = cause.source();
    }
    false
}

/// Fetches URLs, retrying transient failures until a terminal outcome
pub struct ResilientFetcher<T> {
    transport: T,
    policy: TransientRetry,
}

impl<T: Transport> ResilientFetcher<T> {
    pub fn new(transport: T, policy: TransientRetry) -> Self {
        Self { transport, policy }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetches a URL, retrying transient failures per the policy
    ///
    /// Used for both listing and detail pages; callers decide what
    /// `NotFound` and `Failure` mean for them.
    pub async fn fetch(&self, url: &Url) -> FetchOutcome {
        let mut retries = 0u32;

        loop {
            let error = match self.transport.get(url).await {
                Ok(body) => return FetchOutcome::Content(body),
                Err(e) => e,
            };

            if error.is_not_found() {
                tracing::debug!("{} not found ({})", url, error);
                return FetchOutcome::NotFound;
            }

            if !error.is_transient() {
                tracing::warn!("Failed to fetch {}: {}", url, error);
                return FetchOutcome::Failure(error.to_string());
            }

            if !self.policy.allows(retries) {
                tracing::warn!(
                    "Giving up on {} after {} transient retries: {}",
                    url,
                    retries,
                    error
                );
                return FetchOutcome::Failure(format!(
                    "{} (after {} retries)",
                    error, retries
                ));
            }

            retries += 1;
            tracing::warn!(
                "Transient failure fetching {}: {}; retry {} in {:?}",
                url,
                error,
                retries,
                self.policy.delay()
            );
            tokio::time::sleep(self.policy.delay()).await;
        }
    }
}
