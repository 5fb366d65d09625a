//! Prefix-Sweep main entry point
//!
//! This is the command-line interface for the Prefix-Sweep autocomplete crawler.

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use prefix_sweep::config::{load_config, validate, Config};
use prefix_sweep::crawler::{CrawlOutcome, CrawlSupervisor, Shutdown};
use prefix_sweep::events::TracingSink;
use prefix_sweep::output::{aggregate_results, print_reports, print_summary};
use prefix_sweep::variant::VariantProfile;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Prefix-Sweep: exhaustive vocabulary discovery over autocomplete APIs
///
/// Walks every query prefix of each API variant, descending whenever a
/// result page comes back full. Progress is checkpointed so interrupted
/// runs resume where they stopped.
#[derive(Parser, Debug)]
#[command(name = "prefix-sweep")]
#[command(version = "1.0.0")]
#[command(about = "Exhaustive prefix crawler for autocomplete APIs", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory for checkpoint files
    #[arg(long, value_name = "DIR")]
    checkpoint_dir: Option<String>,

    /// Directory for results files
    #[arg(long, value_name = "DIR")]
    results_dir: Option<String>,

    /// Also write a debug log file into this directory
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Comma-separated API variants to crawl
    #[arg(long, value_name = "IDS", value_delimiter = ',')]
    versions: Option<Vec<String>>,

    /// Crawl variants concurrently
    #[arg(long)]
    parallel: bool,

    /// Base URL of the autocomplete service
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Ignore existing checkpoints
    #[arg(long)]
    fresh: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Show the resolved configuration and variant profiles without crawling
    #[arg(long, conflicts_with = "summary")]
    dry_run: bool,

    /// Summarize existing results and exit
    #[arg(long, conflicts_with = "dry_run")]
    summary: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the file configuration
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(dir) = &self.checkpoint_dir {
            config.storage.checkpoint_dir = dir.clone();
        }
        if let Some(dir) = &self.results_dir {
            config.storage.results_dir = dir.clone();
        }
        if let Some(versions) = &self.versions {
            config.crawl.variants = versions
                .iter()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect();
        }
        if let Some(url) = &self.base_url {
            config.service.base_url = url.clone();
        }
        if self.parallel {
            config.crawl.parallel = true;
        }
        if self.fresh {
            config.crawl.fresh = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet, cli.log_dir.as_deref())?;

    let config = resolve_config(&cli)?;

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.summary {
        handle_summary(&config)
    } else {
        handle_crawl(config).await
    }
}

/// Loads the configuration file if given, then applies CLI overrides
fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))?
        }
        None => Config::default(),
    };

    cli.apply_overrides(&mut config);
    validate(&config).context("invalid configuration")?;
    Ok(config)
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// With a log directory, a second layer writes debug output to a
/// timestamped file.
fn setup_logging(verbose: u8, quiet: bool, log_dir: Option<&Path>) -> Result<()> {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("prefix_sweep=info,warn"),
            1 => EnvFilter::new("prefix_sweep=debug,info"),
            _ => EnvFilter::new("prefix_sweep=trace,debug"),
        }
    };

    let console = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_filter(filter);

    let file = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory {}", dir.display()))?;
            let path = dir.join(format!(
                "extraction_{}.log",
                Local::now().format("%Y%m%d_%H%M%S")
            ));
            let handle = File::create(&path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(handle))
                    .with_filter(EnvFilter::new("prefix_sweep=debug,info")),
            )
        }
        None => None,
    };

    tracing_subscriber::registry().with(console).with(file).init();
    Ok(())
}

/// Handles the --dry-run mode: shows the resolved configuration and profiles
fn handle_dry_run(config: &Config) -> Result<()> {
    println!("=== Prefix-Sweep Dry Run ===\n");

    println!("Service:");
    println!("  Base URL: {}", config.service.base_url);
    println!("  Max retries: {}", config.service.max_retries);
    println!("  Retry delay: {}s", config.service.retry_delay_secs);
    println!("  Timeout: {}s", config.service.timeout_secs);

    println!("\nStorage:");
    println!("  Checkpoints: {}", config.storage.checkpoint_dir);
    println!("  Results: {}", config.storage.results_dir);

    println!("\nCrawl:");
    println!("  Parallel: {}", config.crawl.parallel);
    println!("  Fresh: {}", config.crawl.fresh);
    println!("  Checkpoint interval: {}", config.crawl.checkpoint_interval);

    let rates = config.effective_rate_limits();
    println!("\nVariants ({}):", config.crawl.variants.len());
    for id in &config.crawl.variants {
        match VariantProfile::require(id) {
            Ok(profile) => {
                let rate = rates
                    .iter()
                    .find(|(variant, _)| variant == profile.id)
                    .map(|(_, rate)| *rate)
                    .unwrap_or(profile.requests_per_minute);
                println!(
                    "  - {}: {} symbols, page size {}, max length {}, {} req/min",
                    profile.id,
                    profile.character_set.len(),
                    profile.max_page_size,
                    profile.max_prefix_length,
                    rate
                );
                println!(
                    "    * at most {} prefixes",
                    profile.prefix_space_bound()
                );
            }
            Err(e) => println!("  - {}: {}", id, e),
        }
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --summary mode: aggregates existing results artifacts
fn handle_summary(config: &Config) -> Result<()> {
    println!("Results: {}\n", config.storage.results_dir);

    let store = config.storage.file_store();
    let summary = aggregate_results(&store, &config.crawl.variants)
        .context("failed to read results")?;
    print_summary(&summary);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> Result<()> {
    if config.crawl.fresh {
        tracing::info!("Starting fresh crawl (ignoring checkpoints)");
    } else {
        tracing::info!("Starting crawl (resuming from checkpoints where present)");
    }

    let variants = config.crawl.variants.clone();
    let store = config.storage.file_store();
    let supervisor = CrawlSupervisor::from_config(config, TracingSink::shared())
        .context("failed to set up crawl")?;

    let (trigger, shutdown) = Shutdown::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Extraction stopped by user. Saving progress...");
            trigger.trigger();
        }
    });

    let reports = supervisor.run(&variants, shutdown).await;
    print_reports(&reports);

    if reports
        .iter()
        .any(|r| r.outcome == CrawlOutcome::Cancelled)
    {
        tracing::info!("Crawl interrupted; rerun to resume from checkpoints");
    }

    let summary = aggregate_results(&store, &variants).context("failed to read results")?;
    print_summary(&summary);

    Ok(())
}
