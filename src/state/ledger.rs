//! Crawl progress ledger
//!
//! The ledger owns the page cursor and the set of company identities that
//! already have a terminal record in the output. It is handed by reference
//! to every component that reads or mutates progress; persisting it is an
//! explicit [`Ledger::save`] call.

use crate::storage::{Checkpoint, CheckpointStore, StorageResult};
use std::collections::HashSet;

/// Cursor plus processed identities for one partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
    cursor: u32,
    /// Insertion order, as written to the checkpoint
    processed: Vec<String>,
    index: HashSet<String>,
}

impl Ledger {
    /// Creates an empty ledger starting at the given page
    pub fn new(start_page: u32) -> Self {
        Self {
            cursor: start_page,
            processed: Vec::new(),
            index: HashSet::new(),
        }
    }

    /// Rebuilds a ledger from a saved checkpoint
    ///
    /// Duplicate identities in the file are collapsed.
    pub fn from_checkpoint(checkpoint: Checkpoint) -> Self {
        let mut ledger = Self::new(checkpoint.last_page_num);
        for identity in checkpoint.processed_companies {
            ledger.mark_processed(&identity);
        }
        ledger
    }

    /// Loads the ledger for a run
    ///
    /// A missing checkpoint starts cold at `start_page`. An unreadable or
    /// corrupt checkpoint is logged and also starts cold; it is never fatal.
    pub fn load(store: &dyn CheckpointStore, start_page: u32) -> Self {
        match store.load() {
            Ok(Some(checkpoint)) => {
                let ledger = Self::from_checkpoint(checkpoint);
                tracing::info!(
                    "Resuming from page {} with {} companies already processed",
                    ledger.cursor,
                    ledger.processed_count()
                );
                ledger
            }
            Ok(None) => {
                tracing::info!("No checkpoint found, starting at page {}", start_page);
                Self::new(start_page)
            }
            Err(e) => {
                tracing::warn!(
                    "Could not read checkpoint ({}), starting over at page {}",
                    e,
                    start_page
                );
                Self::new(start_page)
            }
        }
    }

    /// The next listing page index to fetch
    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    /// Whether the identity already has a terminal record
    pub fn is_processed(&self, identity: &str) -> bool {
        self.index.contains(identity)
    }

    /// Records an identity as done
    ///
    /// Call only after the identity's record has been appended to the sink.
    /// Returns false if the identity was already present.
    pub fn mark_processed(&mut self, identity: &str) -> bool {
        if !self.index.insert(identity.to_string()) {
            return false;
        }
        self.processed.push(identity.to_string());
        true
    }

    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    /// Processed identities, oldest first
    pub fn processed(&self) -> &[String] {
        &self.processed
    }

    /// Moves the cursor forward and persists
    ///
    /// The cursor never moves backwards.
    pub fn advance_to(&mut self, page: u32, store: &dyn CheckpointStore) -> StorageResult<()> {
        self.save(page.max(self.cursor), store)
    }

    /// Persists the full processed set together with the given cursor
    pub fn save(&mut self, cursor: u32, store: &dyn CheckpointStore) -> StorageResult<()> {
        self.cursor = cursor;
        store.save(self.cursor, &self.processed)
    }
}
