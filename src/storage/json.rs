//! JSON file checkpoint implementation
//!
//! This module provides a file-backed implementation of the CheckpointStore trait.

use crate::storage::traits::{CheckpointStore, StorageError, StorageResult};
use crate::storage::Checkpoint;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Borrowed view of a checkpoint so saving never clones the processed set
#[derive(Serialize)]
struct CheckpointView<'a> {
    #[serde(rename = "lastPageNum")]
    last_page_num: u32,
    #[serde(rename = "processedCompanies")]
    processed_companies: &'a [String],
}

/// Checkpoint stored as a single JSON document
pub struct JsonCheckpointStore {
    path: PathBuf,
}

impl JsonCheckpointStore {
    /// Creates a store for the given checkpoint path
    ///
    /// Nothing is touched on disk until the first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }
}

impl CheckpointStore for JsonCheckpointStore {
    fn load(&self) -> StorageResult<Option<Checkpoint>> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let checkpoint = serde_json::from_slice(&raw)?;
        Ok(Some(checkpoint))
    }

    fn save(&self, cursor: u32, processed: &[String]) -> StorageResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let view = CheckpointView {
            last_page_num: cursor,
            processed_companies: processed,
        };
        let raw = serde_json::to_vec(&view)?;

        // Write the sibling first; rename swaps it in whole.
        let tmp_path = self.temp_path();
        let mut file = File::create(&tmp_path)?;
        file.write_all(&raw)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp_path, &self.path).map_err(|source| StorageError::Replace {
            path: self.path.display().to_string(),
            source,
        })?;

        tracing::trace!(
            "Checkpoint saved: cursor {}, {} processed",
            cursor,
            processed.len()
        );
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
