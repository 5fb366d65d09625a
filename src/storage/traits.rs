//! Storage traits and error types
//!
//! This module defines the trait interface for checkpoint backends and
//! associated error types.

use crate::storage::{Checkpoint, ResultsArtifact};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Serialization error on {path}: {source}")]
    Serialization {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for checkpoint and results backends
///
/// Every record is keyed by variant id, and each crawler only ever touches its
/// own keys, so implementations need no cross-variant locking. Writes must be
/// atomic: a failed save leaves the previous record loadable.
pub trait CheckpointStore: Send + Sync {
    // ===== Checkpoints =====

    /// Loads the checkpoint for a variant
    ///
    /// # Returns
    ///
    /// * `Ok(Some(Checkpoint))` - A checkpoint exists and was parsed
    /// * `Ok(None)` - No checkpoint has been written yet
    /// * `Err(StorageError)` - The checkpoint exists but could not be read
    fn load_checkpoint(&self, variant: &str) -> StorageResult<Option<Checkpoint>>;

    /// Replaces the checkpoint for a variant
    fn save_checkpoint(&self, variant: &str, checkpoint: &Checkpoint) -> StorageResult<()>;

    // ===== Results =====

    /// Writes the final results artifact for a variant
    fn save_results(&self, results: &ResultsArtifact) -> StorageResult<()>;

    /// Loads the results artifact for a variant, if one was written
    fn load_results(&self, variant: &str) -> StorageResult<Option<ResultsArtifact>>;
}
