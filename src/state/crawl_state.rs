use crate::events::{CrawlEvent, EventSink};
use crate::state::PrefixState;
use crate::storage::{Checkpoint, CheckpointStore, ResultsArtifact};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Tracks the progress of one variant's crawl
///
/// Owned by exactly one crawler. Every set only grows, and the request count
/// only increases; restoring from a checkpoint picks up all of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlState {
    variant_id: String,
    progress: Checkpoint,
}

impl CrawlState {
    /// Creates an empty state for a variant
    pub fn new(variant_id: impl Into<String>) -> Self {
        Self {
            variant_id: variant_id.into(),
            progress: Checkpoint::default(),
        }
    }

    /// Creates a state from a previously saved checkpoint
    pub fn from_checkpoint(variant_id: impl Into<String>, checkpoint: Checkpoint) -> Self {
        let mut progress = checkpoint;
        // Older checkpoints may list branching prefixes that were never marked visited
        let stray: Vec<String> = progress
            .branching_prefixes
            .difference(&progress.visited_prefixes)
            .cloned()
            .collect();
        progress.visited_prefixes.extend(stray);

        Self {
            variant_id: variant_id.into(),
            progress,
        }
    }

    /// Restores a variant's state from the store
    ///
    /// A missing checkpoint yields an empty state. An unreadable one is
    /// reported and also yields an empty state: prior work may be redone, but
    /// nothing already found can be corrupted.
    pub fn restore(
        variant_id: &str,
        store: &dyn CheckpointStore,
        sink: &dyn EventSink,
    ) -> Self {
        match store.load_checkpoint(variant_id) {
            Ok(Some(checkpoint)) => {
                let state = Self::from_checkpoint(variant_id, checkpoint);
                sink.emit(CrawlEvent::CheckpointLoaded {
                    variant: variant_id.to_string(),
                    names: state.name_count(),
                    prefixes: state.visited_count(),
                });
                state
            }
            Ok(None) => Self::new(variant_id),
            Err(e) => {
                sink.emit(CrawlEvent::CheckpointLoadFailed {
                    variant: variant_id.to_string(),
                    error: e.to_string(),
                });
                Self::new(variant_id)
            }
        }
    }

    /// Persists the state as the variant's checkpoint
    ///
    /// Failures are reported but never abort the crawl.
    ///
    /// # Returns
    ///
    /// * `true` - The checkpoint was written
    /// * `false` - The write failed and was reported to the sink
    pub fn save(&self, store: &dyn CheckpointStore, sink: &dyn EventSink) -> bool {
        match store.save_checkpoint(&self.variant_id, &self.progress) {
            Ok(()) => {
                sink.emit(CrawlEvent::CheckpointSaved {
                    variant: self.variant_id.clone(),
                    requests: self.progress.request_count,
                });
                true
            }
            Err(e) => {
                sink.emit(CrawlEvent::CheckpointSaveFailed {
                    variant: self.variant_id.clone(),
                    error: e.to_string(),
                });
                false
            }
        }
    }

    pub fn variant_id(&self) -> &str {
        &self.variant_id
    }

    /// Returns true if the prefix was already queried or rejected
    pub fn is_visited(&self, prefix: &str) -> bool {
        self.progress.visited_prefixes.contains(prefix)
    }

    /// Returns true if the prefix was queried and returned a full page
    pub fn is_branching(&self, prefix: &str) -> bool {
        self.progress.branching_prefixes.contains(prefix)
    }

    /// Where a prefix stands in the traversal
    pub fn prefix_state(&self, prefix: &str) -> PrefixState {
        if self.is_branching(prefix) {
            PrefixState::Branching
        } else if !self.is_visited(prefix) {
            PrefixState::Unvisited
        } else if crate::state::rejection_reason(prefix).is_some() {
            PrefixState::Rejected
        } else {
            PrefixState::Terminal
        }
    }

    /// Records a prefix filtered out without a query
    pub fn mark_rejected(&mut self, prefix: &str) {
        self.progress.visited_prefixes.insert(prefix.to_string());
    }

    /// Records a completed query for `prefix`
    ///
    /// Marks the prefix visited, counts the request, merges the names, and
    /// remembers the prefix as branching if `branching` is set. Returns the
    /// number of names not seen before.
    pub fn record_query(&mut self, prefix: &str, names: Vec<String>, branching: bool) -> usize {
        self.progress.visited_prefixes.insert(prefix.to_string());
        self.progress.request_count += 1;
        if branching {
            self.progress.branching_prefixes.insert(prefix.to_string());
        }

        let before = self.progress.names.len();
        self.progress.names.extend(names);
        self.progress.names.len() - before
    }

    pub fn request_count(&self) -> u64 {
        self.progress.request_count
    }

    pub fn name_count(&self) -> usize {
        self.progress.names.len()
    }

    pub fn visited_count(&self) -> usize {
        self.progress.visited_prefixes.len()
    }

    pub fn names(&self) -> &BTreeSet<String> {
        &self.progress.names
    }

    pub fn visited_prefixes(&self) -> &BTreeSet<String> {
        &self.progress.visited_prefixes
    }

    /// Builds the final results artifact
    pub fn results(&self, completed_at: DateTime<Utc>) -> ResultsArtifact {
        ResultsArtifact {
            variant: self.variant_id.clone(),
            names: self.progress.names.iter().cloned().collect(),
            request_count: self.progress.request_count,
            total_names: self.progress.names.len(),
            completed_at: Some(completed_at),
        }
    }
}
