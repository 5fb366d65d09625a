//! Cross-variant totals from the saved results artifacts

use crate::storage::CheckpointStore;
use crate::SweepError;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fmt::Write;

/// Totals for one variant's results artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantTotals {
    pub variant: String,
    pub names: usize,
    pub requests: u64,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Totals across every requested variant
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateSummary {
    /// Variants with a results artifact, in request order
    pub variants: Vec<VariantTotals>,

    /// Requested variants without a results artifact
    pub missing: Vec<String>,

    /// Union of every variant's names
    pub names: BTreeSet<String>,

    pub total_requests: u64,
}

impl AggregateSummary {
    /// Number of distinct names across all variants
    pub fn total_unique(&self) -> usize {
        self.names.len()
    }
}

/// Loads each variant's results artifact and merges them
///
/// # Arguments
///
/// * `store` - Where the results artifacts live
/// * `variants` - Variant ids to include; duplicates count once
///
/// # Returns
///
/// * `Ok(AggregateSummary)` - Totals over every artifact found
/// * `Err(SweepError)` - An artifact exists but could not be read
pub fn aggregate_results(
    store: &dyn CheckpointStore,
    variants: &[String],
) -> Result<AggregateSummary, SweepError> {
    let mut summary = AggregateSummary::default();
    let mut seen = BTreeSet::new();

    for variant in variants {
        if !seen.insert(variant.as_str()) {
            continue;
        }

        let Some(results) = store.load_results(variant)? else {
            summary.missing.push(variant.clone());
            continue;
        };

        summary.total_requests += results.request_count;
        summary.variants.push(VariantTotals {
            variant: results.variant,
            names: results.names.len(),
            requests: results.request_count,
            completed_at: results.completed_at,
        });
        summary.names.extend(results.names);
    }

    Ok(summary)
}

/// Renders the summary as plain text
pub fn format_summary(summary: &AggregateSummary) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== Extraction Summary ===\n");
    for totals in &summary.variants {
        let completed = totals
            .completed_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let _ = writeln!(
            out,
            "  {}: {} names, {} requests (completed {})",
            totals.variant, totals.names, totals.requests, completed
        );
    }
    for variant in &summary.missing {
        let _ = writeln!(out, "  {}: no results", variant);
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Total unique names across all versions: {}",
        summary.total_unique()
    );
    let _ = writeln!(
        out,
        "Total API requests across all versions: {}",
        summary.total_requests
    );

    out
}

/// Prints the summary to stdout
pub fn print_summary(summary: &AggregateSummary) {
    print!("{}", format_summary(summary));
}
