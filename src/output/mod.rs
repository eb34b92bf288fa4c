//! Output module for recording harvested companies
//!
//! This module handles:
//! - The record shape written per company
//! - The append-only sink trait the crawler writes through
//! - The CSV file implementation of that sink

mod csv_sink;
mod traits;

pub use csv_sink::{CsvSink, CSV_HEADER};
pub use traits::{
    Homepage, OutputError, OutputRecord, OutputResult, RecordSink, NOT_FOUND_SENTINEL,
};
