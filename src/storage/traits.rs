//! Storage traits and error types
//!
//! This module defines the trait interface for checkpoint backends and
//! associated error types.

use crate::storage::Checkpoint;
use thiserror::Error;

/// Errors that can occur during checkpoint operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to replace checkpoint {path}: {source}")]
    Replace {
        path: String,
        source: std::io::Error,
    },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for checkpoint backend implementations
///
/// A checkpoint is one snapshot of the crawl cursor plus every company
/// identity already written to the output. Saving replaces the previous
/// snapshot entirely.
pub trait CheckpointStore {
    /// Reads the last saved checkpoint
    ///
    /// # Returns
    ///
    /// * `Ok(Some(Checkpoint))` - A checkpoint exists and parsed cleanly
    /// * `Ok(None)` - No checkpoint has been saved yet
    /// * `Err(StorageError)` - The checkpoint exists but could not be read or parsed
    fn load(&self) -> StorageResult<Option<Checkpoint>>;

    /// Overwrites the checkpoint with the given cursor and processed identities
    ///
    /// # Arguments
    ///
    /// * `cursor` - The next listing page to fetch
    /// * `processed` - Every identity with a terminal record, in insertion order
    fn save(&self, cursor: u32, processed: &[String]) -> StorageResult<()>;

    /// Removes any saved checkpoint so the next load starts cold
    fn clear(&self) -> StorageResult<()>;
}
