//! Crawler module for directory harvesting
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with transient-failure retries
//! - HTML extraction of listing entries and homepage links
//! - Bounded, grouped scheduling of detail fetches
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod parser;
pub mod retry;
mod scheduler;

#[cfg(test)]
mod testing;

pub use coordinator::{run_crawl, Coordinator, CrawlReport, StopReason};
pub use fetcher::{
    build_http_client, FetchOutcome, HttpTransport, ResilientFetcher, Transport, TransportError,
};
pub use parser::{Extractor, Item};
pub use retry::{CappedRetry, TransientRetry};
pub use scheduler::{PageReport, Scheduler};
