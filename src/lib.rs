//! Roster-Crawl: a resumable company directory harvester
//!
//! This crate walks a paginated company directory one listing page at a time,
//! visits every company's detail page, and appends the company's name and
//! homepage link to a CSV file. Progress is checkpointed after every batch so a
//! crawl can be killed and restarted without losing or duplicating work.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Roster-Crawl operations
#[derive(Debug, Error)]
pub enum RosterError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Checkpoint error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector: {0}")]
    InvalidSelector(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Listing URL template is missing the {0} placeholder")]
    MissingPlaceholder(&'static str),
}

/// Result type alias for Roster-Crawl operations
pub type Result<T> = std::result::Result<T, RosterError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlReport, Item, StopReason};
pub use state::Ledger;
pub use crate::url::listing_url;
