//! JSON file storage implementation
//!
//! Checkpoints and results live in two directories, one file per variant:
//!
//! ```text
//! {checkpoint_dir}/v1_checkpoint.json
//! {results_dir}/v1_names.json
//! ```
//!
//! Every write goes to a temporary sibling, is flushed to disk, and is then
//! renamed over the target, so a crash mid-write never leaves a truncated
//! file where a loadable one used to be.

use crate::storage::traits::{CheckpointStore, StorageError, StorageResult};
use crate::storage::{checkpoint_file_name, results_file_name, Checkpoint, ResultsArtifact};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// JSON file storage backend
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    checkpoint_dir: PathBuf,
    results_dir: PathBuf,
}

impl JsonFileStore {
    /// Creates a store rooted at the given directories
    ///
    /// Directories are not created here; see [`JsonFileStore::ensure_dirs`].
    pub fn new(checkpoint_dir: impl Into<PathBuf>, results_dir: impl Into<PathBuf>) -> Self {
        Self {
            checkpoint_dir: checkpoint_dir.into(),
            results_dir: results_dir.into(),
        }
    }

    /// Creates both storage directories if they are missing
    pub fn ensure_dirs(&self) -> StorageResult<()> {
        for dir in [&self.checkpoint_dir, &self.results_dir] {
            fs::create_dir_all(dir).map_err(|source| StorageError::Io {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Path of a variant's checkpoint file
    pub fn checkpoint_path(&self, variant: &str) -> StorageResult<PathBuf> {
        validate_key(variant)?;
        Ok(self.checkpoint_dir.join(checkpoint_file_name(variant)))
    }

    /// Path of a variant's results file
    pub fn results_path(&self, variant: &str) -> StorageResult<PathBuf> {
        validate_key(variant)?;
        Ok(self.results_dir.join(results_file_name(variant)))
    }
}

impl CheckpointStore for JsonFileStore {
    fn load_checkpoint(&self, variant: &str) -> StorageResult<Option<Checkpoint>> {
        read_json(&self.checkpoint_path(variant)?)
    }

    fn save_checkpoint(&self, variant: &str, checkpoint: &Checkpoint) -> StorageResult<()> {
        write_json_atomic(&self.checkpoint_path(variant)?, checkpoint, false)
    }

    fn save_results(&self, results: &ResultsArtifact) -> StorageResult<()> {
        write_json_atomic(&self.results_path(&results.variant)?, results, true)
    }

    fn load_results(&self, variant: &str) -> StorageResult<Option<ResultsArtifact>> {
        read_json(&self.results_path(variant)?)
    }
}

/// Variant ids become file names, so they must not escape the directory
fn validate_key(variant: &str) -> StorageResult<()> {
    let valid = !variant.is_empty()
        && variant
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(variant.to_string()))
    }
}

/// Reads a JSON file, returning None if it doesn't exist
fn read_json<T: DeserializeOwned>(path: &Path) -> StorageResult<Option<T>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StorageError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_reader(BufReader::new(file))
        .map(Some)
        .map_err(|source| StorageError::Serialization {
            path: path.to_path_buf(),
            source,
        })
}

/// Writes JSON to a temporary sibling, syncs it, then renames it into place
///
/// The temporary file is removed on any failure. After the rename the parent
/// directory is synced so the new entry itself is durable.
fn write_json_atomic<T: Serialize>(path: &Path, value: &T, pretty: bool) -> StorageResult<()> {
    let tmp = path.with_extension("json.tmp");

    let written = write_synced(&tmp, path, value, pretty).and_then(|()| {
        fs::rename(&tmp, path).map_err(|source| StorageError::Io {
            path: path.to_path_buf(),
            source,
        })
    });
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    sync_parent_dir(path)
}

/// Serializes `value` into `tmp` and syncs the file contents
fn write_synced<T: Serialize>(
    tmp: &Path,
    target: &Path,
    value: &T,
    pretty: bool,
) -> StorageResult<()> {
    let io_err = |source| StorageError::Io {
        path: tmp.to_path_buf(),
        source,
    };

    let file = File::create(tmp).map_err(io_err)?;
    let mut writer = BufWriter::new(file);

    let written = if pretty {
        serde_json::to_writer_pretty(&mut writer, value)
    } else {
        serde_json::to_writer(&mut writer, value)
    };
    written.map_err(|source| StorageError::Serialization {
        path: target.to_path_buf(),
        source,
    })?;

    writer.flush().map_err(io_err)?;
    let file = writer
        .into_inner()
        .map_err(|e| io_err(e.into_error()))?;
    file.sync_all().map_err(io_err)
}

#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> StorageResult<()> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    File::open(parent)
        .and_then(|dir| dir.sync_all())
        .map_err(|source| StorageError::Io {
            path: parent.to_path_buf(),
            source,
        })
}

// Directories cannot be opened as files here
#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> StorageResult<()> {
    Ok(())
}
