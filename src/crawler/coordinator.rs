//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! the crawling process, including:
//! - Loading the checkpoint and opening the output
//! - Walking listing pages in increasing cursor order
//! - Filtering already-processed companies
//! - Handing the rest to the batch scheduler
//! - Advancing and persisting the cursor

use crate::config::Config;
use crate::crawler::fetcher::{FetchOutcome, HttpTransport, ResilientFetcher, Transport};
use crate::crawler::parser::{Extractor, Item};
use crate::crawler::retry::TransientRetry;
use crate::crawler::scheduler::{PageReport, Scheduler};
use crate::output::{CsvSink, RecordSink};
use crate::state::Ledger;
use crate::storage::{CheckpointStore, JsonCheckpointStore};
use crate::url::listing_url;
use crate::RosterError;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Why the crawl loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The listing page was missing, failed, or empty; the directory is
    /// exhausted or the crawler is being blocked
    ListingUnavailable,

    /// The listing page had no companies: end of the partition
    NoItems,

    /// The configured page limit was reached
    PageLimit,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ListingUnavailable => write!(f, "listing page unavailable"),
            Self::NoItems => write!(f, "listing page had no companies"),
            Self::PageLimit => write!(f, "page limit reached"),
        }
    }
}

/// Summary of one crawl run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlReport {
    pub start_page: u32,
    pub final_cursor: u32,
    pub pages_crawled: u32,
    pub records_written: usize,
    pub not_found: usize,
    pub dropped: Vec<String>,
    pub stop_reason: StopReason,
}

/// Main crawler coordinator structure
pub struct Coordinator<T> {
    config: Arc<Config>,
    fetcher: Arc<ResilientFetcher<T>>,
    extractor: Arc<Extractor>,
    scheduler: Scheduler<T>,
    ledger: Ledger,
    checkpoint: Box<dyn CheckpointStore>,
    sink: Box<dyn RecordSink>,
}

impl Coordinator<HttpTransport> {
    /// Creates a coordinator wired to HTTP, the JSON checkpoint and the CSV output
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `fresh` - Ignore any saved checkpoint and start at the configured page
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(RosterError)` - Failed to build the client or open the output
    pub fn new(config: Config, fresh: bool) -> Result<Self, RosterError> {
        let transport =
            HttpTransport::new(&config.user_agent, config.crawler.request_timeout())?;
        let checkpoint = JsonCheckpointStore::new(config.checkpoint_path());
        let sink = CsvSink::open(&config.output_path())?;

        Self::with_parts(config, transport, Box::new(checkpoint), Box::new(sink), fresh)
    }
}

impl<T: Transport> Coordinator<T> {
    /// Creates a coordinator from explicit collaborators
    pub fn with_parts(
        config: Config,
        transport: T,
        checkpoint: Box<dyn CheckpointStore>,
        sink: Box<dyn RecordSink>,
        fresh: bool,
    ) -> Result<Self, RosterError> {
        let ledger = if fresh {
            tracing::info!(
                "Fresh crawl requested, discarding saved checkpoint; starting at page {}",
                config.target.start_page
            );
            checkpoint.clear()?;
            Ledger::new(config.target.start_page)
        } else {
            Ledger::load(checkpoint.as_ref(), config.target.start_page)
        };

        let fetcher = Arc::new(ResilientFetcher::new(
            transport,
            TransientRetry::from_config(&config.crawler),
        ));
        let extractor = Arc::new(Extractor::new(&config.selectors)?);
        let scheduler = Scheduler::from_config(&config.crawler, fetcher.clone(), extractor.clone());

        Ok(Self {
            config: Arc::new(config),
            fetcher,
            extractor,
            scheduler,
            ledger,
            checkpoint,
            sink,
        })
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Runs the main crawl loop
    ///
    /// For each page from the ledger's cursor:
    /// 1. Fetches the listing page; missing or empty content stops the crawl
    /// 2. Extracts companies; none stops the crawl without advancing
    /// 3. Drops companies already processed
    /// 4. Hands the rest to the scheduler
    /// 5. Advances and persists the cursor
    pub async fn run(&mut self) -> Result<CrawlReport, RosterError> {
        let start_page = self.ledger.cursor();
        let start_time = Instant::now();
        tracing::info!(
            "Starting crawl of partition '{}' at page {}",
            self.config.target.partition,
            start_page
        );

        let mut report = CrawlReport {
            start_page,
            final_cursor: start_page,
            pages_crawled: 0,
            records_written: 0,
            not_found: 0,
            dropped: Vec::new(),
            stop_reason: StopReason::NoItems,
        };

        let stop_reason = loop {
            if let Some(max_pages) = self.config.crawler.max_pages {
                if report.pages_crawled >= max_pages {
                    break StopReason::PageLimit;
                }
            }

            let page = self.ledger.cursor();
            let page_url = listing_url(
                &self.config.target.listing_url,
                &self.config.target.partition,
                page,
            )?;
            tracing::info!("Fetching listing page {}: {}", page, page_url);

            let html = match self.fetcher.fetch(&page_url).await {
                FetchOutcome::Content(body) if !body.trim().is_empty() => body,
                FetchOutcome::Content(_) => {
                    tracing::info!("Listing page {} is empty, stopping", page);
                    break StopReason::ListingUnavailable;
                }
                FetchOutcome::NotFound => {
                    tracing::info!("Listing page {} not found, stopping", page);
                    break StopReason::ListingUnavailable;
                }
                FetchOutcome::Failure(reason) => {
                    tracing::warn!("Listing page {} unavailable ({}), stopping", page, reason);
                    break StopReason::ListingUnavailable;
                }
            };

            let items = self.extractor.listing_items(&html, &page_url);
            if items.is_empty() {
                tracing::info!("No companies on listing page {}, end of partition", page);
                break StopReason::NoItems;
            }

            let found = items.len();
            let pending = self.filter_pending(items);
            tracing::info!(
                "Page {}: {} companies, {} new",
                page,
                found,
                pending.len()
            );

            if !pending.is_empty() {
                let page_report = self
                    .scheduler
                    .process_page(
                        &pending,
                        &page_url,
                        page,
                        &mut self.ledger,
                        self.sink.as_mut(),
                        self.checkpoint.as_ref(),
                    )
                    .await?;
                absorb(&mut report, page_report);
            }

            self.ledger.advance_to(page + 1, self.checkpoint.as_ref())?;
            report.pages_crawled += 1;
        };

        report.stop_reason = stop_reason;
        report.final_cursor = self.ledger.cursor();

        tracing::info!(
            "Crawl stopped ({}) at page {}: {} pages, {} records, {} not found, {} dropped in {:?}",
            report.stop_reason,
            report.final_cursor,
            report.pages_crawled,
            report.records_written,
            report.not_found,
            report.dropped.len(),
            start_time.elapsed()
        );

        Ok(report)
    }

    /// Keeps companies not yet processed, first occurrence of each name only
    fn filter_pending(&self, items: Vec<Item>) -> Vec<Item> {
        let mut seen = HashSet::new();
        items
            .into_iter()
            .filter(|item| {
                if self.ledger.is_processed(&item.identity) {
                    return false;
                }
                if !seen.insert(item.identity.clone()) {
                    tracing::debug!(
                        "Duplicate company name '{}' on one page, keeping the first",
                        item.identity
                    );
                    return false;
                }
                true
            })
            .collect()
    }
}

fn absorb(report: &mut CrawlReport, page: PageReport) {
    report.records_written += page.recorded + page.not_found;
    report.not_found += page.not_found;
    report.dropped.extend(page.dropped);
}

/// Runs the main crawl operation
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `fresh` - Ignore any saved checkpoint
///
/// # Example
///
/// ```no_run
/// use roster_crawl::config::load_config;
/// use roster_crawl::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let report = run_crawl(config, false).await?;
/// println!("{} records written", report.records_written);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config, fresh: bool) -> Result<CrawlReport, RosterError> {
    let mut coordinator = Coordinator::new(config, fresh)?;
    coordinator.run().await
}
