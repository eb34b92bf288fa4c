//! Roster-Crawl main entry point
//!
//! This is the command-line interface for the Roster-Crawl directory harvester.

use anyhow::Context;
use clap::Parser;
use roster_crawl::config::{load_config_with_hash, validate, Config};
use roster_crawl::crawler::run_crawl;
use roster_crawl::listing_url;
use roster_crawl::storage::{CheckpointStore, JsonCheckpointStore};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Roster-Crawl: a resumable company directory harvester
///
/// Roster-Crawl walks one partition of a paginated company directory,
/// visits each company's detail page, and appends the company's homepage
/// to a CSV file. Interrupted runs resume from the saved checkpoint.
#[derive(Parser, Debug)]
#[command(name = "roster-crawl")]
#[command(version)]
#[command(about = "A resumable company directory harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Crawl this partition instead of the configured one
    #[arg(short, long)]
    partition: Option<String>,

    /// Override the number of detail pages fetched at once
    #[arg(short, long)]
    concurrency: Option<u32>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Ignore the saved checkpoint and start at the configured page
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with = "status")]
    dry_run: bool,

    /// Show the saved checkpoint and exit
    #[arg(long, conflicts_with = "dry_run")]
    status: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(partition) = cli.partition {
        config.target.partition = partition;
    }
    if let Some(concurrency) = cli.concurrency {
        config.crawler.concurrency_limit = concurrency;
    }
    validate(&config).context("invalid command-line override")?;

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.status {
        handle_status(&config)
    } else {
        handle_crawl(config, cli.fresh).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("roster_crawl=info,warn"),
            1 => EnvFilter::new("roster_crawl=debug,info"),
            2 => EnvFilter::new("roster_crawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the resolved configuration
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Roster-Crawl Dry Run ===\n");

    println!("Target:");
    println!("  Partition: {}", config.target.partition);
    println!("  Start page: {}", config.target.start_page);
    println!(
        "  First listing URL: {}",
        listing_url(
            &config.target.listing_url,
            &config.target.partition,
            config.target.start_page
        )?
    );

    println!("\nCrawler:");
    println!("  Concurrency limit: {}", config.crawler.concurrency_limit);
    println!("  Request timeout: {}ms", config.crawler.request_timeout_ms);
    println!("  Retry delay: {}ms", config.crawler.retry_delay_ms);
    println!("  Company retries: {}", config.crawler.item_retries);
    match config.crawler.transient_retries.ceiling() {
        Some(ceiling) => println!("  Transient retries: {}", ceiling),
        None => println!("  Transient retries: unbounded"),
    }
    match config.crawler.max_pages {
        Some(max) => println!("  Max pages: {}", max),
        None => println!("  Max pages: no limit"),
    }

    println!("\nSelectors:");
    println!("  Listing item: {}", config.selectors.listing_item);
    println!("  Homepage link: {}", config.selectors.homepage_link);

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Records: {}", config.output_path().display());
    println!("  Checkpoint: {}", config.checkpoint_path().display());

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --status mode: shows the saved checkpoint
fn handle_status(config: &Config) -> anyhow::Result<()> {
    let store = JsonCheckpointStore::new(config.checkpoint_path());
    println!("Checkpoint: {}\n", store.path().display());

    match store.load().context("failed to read checkpoint")? {
        Some(checkpoint) => {
            println!("  Next page: {}", checkpoint.last_page_num);
            println!(
                "  Companies processed: {}",
                checkpoint.processed_companies.len()
            );
        }
        None => {
            println!(
                "  No checkpoint; a crawl would start at page {}",
                config.target.start_page
            );
        }
    }

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, fresh: bool) -> anyhow::Result<()> {
    tracing::info!(
        "Partition '{}', concurrency {}, output {}",
        config.target.partition,
        config.crawler.concurrency_limit,
        config.output_path().display()
    );

    match run_crawl(config, fresh).await {
        Ok(report) => {
            tracing::info!(
                "Crawl finished: {} ({} records, next page {})",
                report.stop_reason,
                report.records_written,
                report.final_cursor
            );
            if !report.dropped.is_empty() {
                tracing::warn!(
                    "{} companies were dropped and will be retried next run",
                    report.dropped.len()
                );
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
