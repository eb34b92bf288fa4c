//! Storage module for persisting crawl progress
//!
//! This module handles the checkpoint file that lets an interrupted crawl
//! resume where it stopped:
//! - JSON encoding of the cursor and processed identities
//! - Atomic replacement of the previous checkpoint
//! - Tolerant loading (a missing file is a cold start)

mod json;
mod traits;

pub use json::JsonCheckpointStore;
pub use traits::{CheckpointStore, StorageError, StorageResult};

use serde::{Deserialize, Serialize};

/// On-disk checkpoint layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Next listing page index to fetch
    #[serde(rename = "lastPageNum")]
    pub last_page_num: u32,

    /// Identities already written to the output, oldest first
    #[serde(rename = "processedCompanies", default)]
    pub processed_companies: Vec<String>,
}
