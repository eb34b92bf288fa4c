//! Retry policies
//!
//! Two policies with deliberately different shapes:
//! - [`TransientRetry`] guards a single request against network trouble and,
//!   unless a ceiling is configured, never gives up.
//! - [`CappedRetry`] guards a whole per-company operation and gives up after
//!   a fixed number of retries.

use crate::config::CrawlerConfig;
use std::time::Duration;

/// Retry policy for transient network failures on one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransientRetry {
    delay: Duration,
    ceiling: Option<u32>,
}

impl TransientRetry {
    /// Retries forever, waiting `delay` between attempts
    pub fn unbounded(delay: Duration) -> Self {
        Self {
            delay,
            ceiling: None,
        }
    }

    /// Retries at most `ceiling` times, waiting `delay` between attempts
    pub fn with_ceiling(delay: Duration, ceiling: u32) -> Self {
        Self {
            delay,
            ceiling: Some(ceiling),
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        match config.transient_retries.ceiling() {
            Some(ceiling) => Self::with_ceiling(config.retry_delay(), ceiling),
            None => Self::unbounded(config.retry_delay()),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn ceiling(&self) -> Option<u32> {
        self.ceiling
    }

    /// Whether one more retry is allowed after `retries_done` retries
    pub fn allows(&self, retries_done: u32) -> bool {
        self.ceiling.map_or(true, |ceiling| retries_done < ceiling)
    }
}

/// Retry policy for one company's fetch-and-extract operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CappedRetry {
    retries: u32,
    delay: Duration,
}

impl CappedRetry {
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(config.item_retries, config.retry_delay())
    }

    /// Retries granted after the first attempt
    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}
