//! Output module for crawl summaries
//!
//! This module handles:
//! - Aggregating per-variant results artifacts into run totals
//! - Rendering the totals and per-crawler reports for the terminal

pub mod summary;

pub use summary::{
    aggregate_results, format_summary, print_summary, AggregateSummary, VariantTotals,
};

use crate::crawler::{CrawlOutcome, CrawlReport};

/// Prints one line per crawler run
///
/// # Arguments
///
/// * `reports` - Reports returned by the supervisor
pub fn print_reports(reports: &[CrawlReport]) {
    for report in reports {
        let outcome = match report.outcome {
            CrawlOutcome::Completed => "completed",
            CrawlOutcome::Cancelled => "cancelled",
        };
        println!(
            "{}: {} after {} requests in {:.1}s, {} names{}",
            report.variant,
            outcome,
            report.requests,
            report.elapsed.as_secs_f64(),
            report.names,
            if report.results_saved || report.outcome == CrawlOutcome::Cancelled {
                ""
            } else {
                " (results not saved)"
            }
        );
    }
}
