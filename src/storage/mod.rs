//! Storage module for persisting crawl progress
//!
//! This module handles:
//! - Per-variant checkpoints (names, visited prefixes, request count)
//! - Per-variant final results artifacts
//! - Atomic JSON file persistence and an in-memory backend

mod json;
mod memory;
mod traits;

pub use json::JsonFileStore;
pub use memory::MemoryStore;
pub use traits::{CheckpointStore, StorageError, StorageResult};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Durable snapshot of one variant's crawl progress
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Every suggestion seen so far
    #[serde(default)]
    pub names: BTreeSet<String>,

    /// Every prefix queried or rejected
    #[serde(default)]
    pub visited_prefixes: BTreeSet<String>,

    /// Number of queries issued
    #[serde(default)]
    pub request_count: u64,

    /// Visited prefixes whose query returned a full page
    #[serde(default)]
    pub branching_prefixes: BTreeSet<String>,
}

/// Final output of a completed crawl for one variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultsArtifact {
    /// Variant id (kept under the `version` key for compatibility)
    #[serde(rename = "version")]
    pub variant: String,

    /// Discovered names, sorted
    pub names: Vec<String>,

    /// Total queries issued for the variant
    pub request_count: u64,

    /// Number of unique names
    pub total_names: usize,

    /// When the crawl finished
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// File name of a variant's checkpoint
pub fn checkpoint_file_name(variant: &str) -> String {
    format!("{}_checkpoint.json", variant)
}

/// File name of a variant's results artifact
pub fn results_file_name(variant: &str) -> String {
    format!("{}_names.json", variant)
}
