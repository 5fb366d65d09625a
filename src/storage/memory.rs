//! In-memory storage implementation
//!
//! Useful for tests and dry runs; nothing survives the process.

use crate::storage::traits::{CheckpointStore, StorageResult};
use crate::storage::{Checkpoint, ResultsArtifact};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Storage backend keeping every record in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    checkpoints: Mutex<HashMap<String, Checkpoint>>,
    results: Mutex<HashMap<String, ResultsArtifact>>,
    checkpoint_saves: Mutex<HashMap<String, usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of checkpoint saves recorded for a variant
    pub fn checkpoint_saves(&self, variant: &str) -> usize {
        self.checkpoint_saves
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(variant)
            .copied()
            .unwrap_or(0)
    }
}

impl CheckpointStore for MemoryStore {
    fn load_checkpoint(&self, variant: &str) -> StorageResult<Option<Checkpoint>> {
        Ok(self
            .checkpoints
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(variant)
            .cloned())
    }

    fn save_checkpoint(&self, variant: &str, checkpoint: &Checkpoint) -> StorageResult<()> {
        self.checkpoints
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(variant.to_string(), checkpoint.clone());
        *self
            .checkpoint_saves
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(variant.to_string())
            .or_insert(0) += 1;
        Ok(())
    }

    fn save_results(&self, results: &ResultsArtifact) -> StorageResult<()> {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(results.variant.clone(), results.clone());
        Ok(())
    }

    fn load_results(&self, variant: &str) -> StorageResult<Option<ResultsArtifact>> {
        Ok(self
            .results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(variant)
            .cloned())
    }
}
