//! Crawler module for prefix traversal against the autocomplete service
//!
//! This module contains the core crawling logic, including:
//! - Querying the service with retry and `Retry-After` handling
//! - Per-variant sliding-window rate limiting
//! - Depth-first prefix expansion with checkpointing
//! - Running variants concurrently and handling shutdown

mod client;
mod prefix_crawler;
mod rate_limiter;
mod shutdown;
mod supervisor;

#[cfg(test)]
mod testing;

pub use client::{
    build_http_client, endpoint_url, parse_retry_after, parse_suggestions, HttpTransport,
    QueryOutcome, RawResponse, ResponseShapeError, RetryPolicy, ServiceClient, Transport,
    TransportError,
};
pub use prefix_crawler::{
    CrawlContext, CrawlOutcome, CrawlReport, PrefixCrawler, DEFAULT_CHECKPOINT_INTERVAL,
};
pub use rate_limiter::{RateLimiter, SlidingWindow, RATE_WINDOW};
pub use shutdown::{Cancelled, Shutdown, ShutdownTrigger};
pub use supervisor::CrawlSupervisor;

use crate::config::Config;
use crate::events::SharedSink;
use crate::SweepError;

/// Runs a complete crawl operation
///
/// This is the main entry point for a crawl over HTTP. It will:
/// 1. Create the checkpoint and results directories
/// 2. Build the HTTP transport
/// 3. Crawl every configured variant, resuming from checkpoints
///
/// # Arguments
///
/// * `config` - The crawl configuration
/// * `sink` - Receiver for crawl events
/// * `shutdown` - Stops every crawler at its next step once triggered
///
/// # Returns
///
/// * `Ok(Vec<CrawlReport>)` - One report per variant crawler that ran
/// * `Err(SweepError)` - Setup failed before any crawler started
pub async fn crawl(
    config: Config,
    sink: SharedSink,
    shutdown: Shutdown,
) -> Result<Vec<CrawlReport>, SweepError> {
    let variants = config.crawl.variants.clone();
    let supervisor = CrawlSupervisor::from_config(config, sink)?;
    Ok(supervisor.run(&variants, shutdown).await)
}
