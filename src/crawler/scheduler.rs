//! Batch scheduler for a listing page's companies
//!
//! This module handles:
//! - Splitting a page's companies into groups of the concurrency limit
//! - Running each group's detail fetches concurrently, one group at a time
//! - Capped per-company retries and one sequential straggler sweep
//! - Appending records and updating the ledger as companies complete
//! - Saving the checkpoint after every group and every swept company

use crate::config::CrawlerConfig;
use crate::crawler::fetcher::{FetchOutcome, ResilientFetcher, Transport};
use crate::crawler::parser::{Extractor, Item};
use crate::crawler::retry::CappedRetry;
use crate::output::{Homepage, OutputRecord, RecordSink};
use crate::state::Ledger;
use crate::storage::CheckpointStore;
use crate::RosterError;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use url::Url;

/// What happened to one listing page's companies
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageReport {
    /// Records written with a homepage or an empty homepage
    pub recorded: usize,

    /// Records written with the not-found sentinel
    pub not_found: usize,

    /// Companies given up on for this run
    pub dropped: Vec<String>,
}

/// Runs fetch-and-record work for companies in bounded groups
pub struct Scheduler<T> {
    fetcher: Arc<ResilientFetcher<T>>,
    extractor: Arc<Extractor>,
    concurrency_limit: usize,
    retry: CappedRetry,
}

impl<T: Transport> Scheduler<T> {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Fetcher shared with the crawl loop
    /// * `extractor` - Compiled selectors
    /// * `concurrency_limit` - Maximum detail fetches in flight (at least 1)
    /// * `retry` - Per-company retry policy
    pub fn new(
        fetcher: Arc<ResilientFetcher<T>>,
        extractor: Arc<Extractor>,
        concurrency_limit: usize,
        retry: CappedRetry,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            concurrency_limit: concurrency_limit.max(1),
            retry,
        }
    }

    pub fn from_config(
        config: &CrawlerConfig,
        fetcher: Arc<ResilientFetcher<T>>,
        extractor: Arc<Extractor>,
    ) -> Self {
        Self::new(
            fetcher,
            extractor,
            config.concurrency_limit as usize,
            CappedRetry::from_config(config),
        )
    }

    /// Processes one page's not-yet-processed companies
    ///
    /// Groups run strictly one after another. Within a group every company
    /// is polled concurrently on the current task, and each finished company
    /// is appended to `sink` and marked in `ledger` as soon as it completes.
    /// Each company recovered by the sequential sweep, and then the whole
    /// group, saves the ledger with `page` as the cursor, so a crash re-reads
    /// this page and skips what is already done.
    ///
    /// # Returns
    ///
    /// * `Ok(PageReport)` - Counts of written and dropped companies
    /// * `Err(RosterError)` - The sink or the checkpoint could not be written
    pub async fn process_page(
        &self,
        items: &[Item],
        source_url: &Url,
        page: u32,
        ledger: &mut Ledger,
        sink: &mut dyn RecordSink,
        checkpoint: &dyn CheckpointStore,
    ) -> Result<PageReport, RosterError> {
        let mut report = PageReport::default();
        let group_count = items.len().div_ceil(self.concurrency_limit);

        for (index, group) in items.chunks(self.concurrency_limit).enumerate() {
            tracing::debug!(
                "Page {}: group {}/{} ({} companies)",
                page,
                index + 1,
                group_count,
                group.len()
            );

            let mut in_flight: FuturesUnordered<_> = group
                .iter()
                .map(|item| self.work_item(item, true))
                .collect();

            let mut stragglers = Vec::new();
            while let Some((item, homepage)) = in_flight.next().await {
                match homepage {
                    Some(homepage) => {
                        self.record(item, homepage, source_url, ledger, sink, &mut report)?
                    }
                    None => stragglers.push(item),
                }
            }
            drop(in_flight);

            for item in stragglers {
                tracing::info!("Sweeping straggler '{}'", item.identity);
                match self.work_item(item, false).await {
                    (item, Some(homepage)) => {
                        self.record(item, homepage, source_url, ledger, sink, &mut report)?;
                        ledger.save(page, checkpoint)?;
                    }
                    (item, None) => {
                        tracing::warn!(
                            "Dropping '{}' ({}) for this run after exhausting retries",
                            item.identity,
                            item.detail_url
                        );
                        report.dropped.push(item.identity.clone());
                    }
                }
            }

            ledger.save(page, checkpoint)?;
        }

        Ok(report)
    }

    /// Runs one retry cycle for a company
    ///
    /// With `first_try_immediate` the company gets one attempt plus the
    /// policy's retries; without it (the straggler sweep) it gets only the
    /// retries, each preceded by the policy delay.
    async fn work_item<'a>(
        &self,
        item: &'a Item,
        first_try_immediate: bool,
    ) -> (&'a Item, Option<Homepage>) {
        let mut attempt = 0u32;

        if first_try_immediate {
            attempt += 1;
            if let Some(homepage) = self.try_item(item, attempt).await {
                return (item, Some(homepage));
            }
        }

        for _ in 0..self.retry.retries() {
            tokio::time::sleep(self.retry.delay()).await;
            attempt += 1;
            if let Some(homepage) = self.try_item(item, attempt).await {
                return (item, Some(homepage));
            }
        }

        (item, None)
    }

    /// One fetch-and-extract attempt; None means retryable failure
    async fn try_item(&self, item: &Item, attempt: u32) -> Option<Homepage> {
        match self.fetcher.fetch(&item.detail_url).await {
            FetchOutcome::NotFound => Some(Homepage::NotFound),
            FetchOutcome::Content(body) if body.trim().is_empty() => {
                tracing::warn!(
                    "Empty detail page for '{}' (attempt {})",
                    item.identity,
                    attempt
                );
                None
            }
            FetchOutcome::Content(body) => Some(
                match self.extractor.homepage_link(&body, &item.detail_url) {
                    Some(url) => Homepage::Found(url),
                    None => Homepage::Missing,
                },
            ),
            FetchOutcome::Failure(reason) => {
                tracing::warn!(
                    "Failed to fetch '{}' (attempt {}): {}",
                    item.identity,
                    attempt,
                    reason
                );
                None
            }
        }
    }

    /// Appends the record, then marks the company processed
    fn record(
        &self,
        item: &Item,
        homepage: Homepage,
        source_url: &Url,
        ledger: &mut Ledger,
        sink: &mut dyn RecordSink,
        report: &mut PageReport,
    ) -> Result<(), RosterError> {
        let record = OutputRecord {
            source_url: source_url.to_string(),
            company_name: item.identity.clone(),
            homepage,
        };
        sink.append(&record)?;

        if !ledger.mark_processed(&item.identity) {
            tracing::debug!("'{}' was already marked processed", item.identity);
        }

        match record.homepage {
            Homepage::NotFound => {
                tracing::info!("'{}': detail page not found", item.identity);
                report.not_found += 1;
            }
            _ => {
                tracing::info!(
                    "'{}': {}",
                    item.identity,
                    match record.homepage.as_field() {
                        "" => "no homepage listed",
                        url => url,
                    }
                );
                report.recorded += 1;
            }
        }

        Ok(())
    }
}
