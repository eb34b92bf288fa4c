//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `Ledger`: the page cursor and the set of company identities that already
//!   have a terminal record, persisted through a `CheckpointStore`

mod ledger;

pub use ledger::Ledger;
