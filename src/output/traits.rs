//! Output sink traits and types
//!
//! This module defines the trait interface for record sinks and the record
//! shape written for every company.

use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Sentinel written in the homepage column when the detail page does not exist
pub const NOT_FOUND_SENTINEL: &str = "NOT_FOUND";

/// Outcome of looking for a company's homepage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Homepage {
    /// The detail page linked to this homepage
    Found(String),

    /// The detail page exists but carries no homepage link
    Missing,

    /// The detail page itself returned not-found
    NotFound,
}

impl Homepage {
    /// The value written to the homepage column
    pub fn as_field(&self) -> &str {
        match self {
            Self::Found(url) => url,
            Self::Missing => "",
            Self::NotFound => NOT_FOUND_SENTINEL,
        }
    }
}

/// One terminal row of output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRecord {
    /// Listing page the company was found on
    pub source_url: String,

    /// Company display name (also the dedup identity)
    pub company_name: String,

    pub homepage: Homepage,
}

impl OutputRecord {
    pub fn fields(&self) -> [&str; 3] {
        [&self.source_url, &self.company_name, self.homepage.as_field()]
    }
}

/// Trait for append-only record sinks
///
/// `append` must not return until the record is durable; the ledger marks a
/// company processed right after a successful append.
pub trait RecordSink {
    /// Durably appends one record
    fn append(&mut self, record: &OutputRecord) -> OutputResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_homepage_fields() {
        assert_eq!(Homepage::Found("https://acme.test".into()).as_field(), "https://acme.test");
        assert_eq!(Homepage::Missing.as_field(), "");
        assert_eq!(Homepage::NotFound.as_field(), "NOT_FOUND");
    }

    #[test]
    fn test_record_fields_order() {
        let record = OutputRecord {
            source_url: "https://example.com/x-3".into(),
            company_name: "Acme".into(),
            homepage: Homepage::Missing,
        };
        assert_eq!(record.fields(), ["https://example.com/x-3", "Acme", ""]);
    }
}
