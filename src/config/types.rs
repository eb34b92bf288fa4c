use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Roster-Crawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub target: TargetConfig,
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

impl Config {
    /// Path of the CSV file records for the configured partition are appended to
    pub fn output_path(&self) -> PathBuf {
        self.output
            .output_dir
            .join(format!("companies_{}.csv", self.target.partition))
    }

    /// Path of the checkpoint file for the configured partition
    pub fn checkpoint_path(&self) -> PathBuf {
        self.output
            .output_dir
            .join(format!("checkpoint_{}.json", self.target.partition))
    }
}

/// Which directory listing to walk
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    /// Listing page URL with `{partition}` and `{page}` placeholders
    #[serde(rename = "listing-url")]
    pub listing_url: String,

    /// Pagination key segment, e.g. a single letter or a digit range
    pub partition: String,

    /// Page index a cold start begins at
    #[serde(rename = "start-page", default = "default_start_page")]
    pub start_page: u32,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of detail pages fetched at the same time
    #[serde(rename = "concurrency-limit", default = "default_concurrency_limit")]
    pub concurrency_limit: u32,

    /// Per-request timeout (milliseconds)
    #[serde(rename = "request-timeout-ms", default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Fixed wait between any two attempts of the same work (milliseconds)
    #[serde(rename = "retry-delay-ms", default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Retries granted to a single company after its first failed attempt
    #[serde(rename = "item-retries", default = "default_item_retries")]
    pub item_retries: u32,

    /// How often a transient network failure is retried
    #[serde(rename = "transient-retries", default)]
    pub transient_retries: TransientRetries,

    /// Stop after this many listing pages (no bound when absent)
    #[serde(rename = "max-pages", default)]
    pub max_pages: Option<u32>,
}

impl CrawlerConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: default_concurrency_limit(),
            request_timeout_ms: default_request_timeout_ms(),
            retry_delay_ms: default_retry_delay_ms(),
            item_retries: default_item_retries(),
            transient_retries: TransientRetries::default(),
            max_pages: None,
        }
    }
}

/// Retry ceiling for transient failures: `"unbounded"` or a number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TransientRetries {
    Limited(u32),
    Keyword(RetryKeyword),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryKeyword {
    Unbounded,
}

impl TransientRetries {
    /// Returns the ceiling, or None for retry-forever
    pub fn ceiling(&self) -> Option<u32> {
        match self {
            Self::Limited(n) => Some(*n),
            Self::Keyword(RetryKeyword::Unbounded) => None,
        }
    }
}

impl Default for TransientRetries {
    fn default() -> Self {
        Self::Keyword(RetryKeyword::Unbounded)
    }
}

/// CSS selectors used to pull data out of listing and detail pages
#[derive(Debug, Clone, Deserialize)]
pub struct SelectorConfig {
    /// Matches one anchor per company on a listing page
    #[serde(rename = "listing-item", default = "default_listing_item_selector")]
    pub listing_item: String,

    /// Matches the external homepage anchor on a detail page
    #[serde(rename = "homepage-link", default = "default_homepage_link_selector")]
    pub homepage_link: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            listing_item: default_listing_item_selector(),
            homepage_link: default_homepage_link_selector(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Format: CrawlerName/Version (+ContactURL; ContactEmail)
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory holding the CSV output and checkpoint files
    #[serde(rename = "output-dir")]
    pub output_dir: PathBuf,
}

fn default_start_page() -> u32 {
    1
}

fn default_concurrency_limit() -> u32 {
    10
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_retry_delay_ms() -> u64 {
    30_000
}

fn default_item_retries() -> u32 {
    3
}

fn default_listing_item_selector() -> String {
    "ul.company-list li a".to_string()
}

fn default_homepage_link_selector() -> String {
    "a.company-website".to_string()
}
