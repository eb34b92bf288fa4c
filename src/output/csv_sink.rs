//! CSV output sink
//!
//! Appends one fully quoted row per company and syncs it to disk before
//! returning. A header row is written once when the file is new or empty.

use crate::output::traits::{OutputRecord, OutputResult, RecordSink};
use csv::{QuoteStyle, Writer, WriterBuilder};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

const TAIL_CHUNK: u64 = 8 * 1024;

/// Header row of every output file
pub const CSV_HEADER: [&str; 3] = ["sourceurl", "company_name", "company_homepage_url"];

/// Append-only CSV file sink
pub struct CsvSink {
    writer: Writer<File>,
}

impl CsvSink {
    /// Opens (or creates) the output file for appending
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the CSV file; missing parent directories are created
    ///
    /// # Returns
    ///
    /// * `Ok(CsvSink)` - File open, header present
    /// * `Err(OutputError)` - Failed to open the file or write the header
    pub fn open(path: &Path) -> OutputResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let existing_len = match fs::metadata(path) {
            Ok(meta) => trim_torn_row(path, meta.len())?,
            Err(e) if e.kind() == ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        if existing_len == 0 {
            let mut header = WriterBuilder::new()
                .has_headers(false)
                .quote_style(QuoteStyle::Necessary)
                .from_writer(&file);
            header.write_record(CSV_HEADER)?;
            header.flush()?;
            drop(header);
            file.sync_data()?;
            tracing::debug!("Wrote header to new output file {}", path.display());
        }

        let writer = WriterBuilder::new()
            .has_headers(false)
            .quote_style(QuoteStyle::Always)
            .from_writer(file);

        Ok(Self { writer })
    }
}

impl RecordSink for CsvSink {
    fn append(&mut self, record: &OutputRecord) -> OutputResult<()> {
        self.writer.write_record(record.fields())?;
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        Ok(())
    }
}

/// Cuts a partial last row left by an interrupted write
///
/// A row is only ever counted as written once its terminator is synced, so
/// anything after the last newline belongs to a company that was never
/// marked processed. Returns the file length after trimming.
fn trim_torn_row(path: &Path, len: u64) -> std::io::Result<u64> {
    if len == 0 {
        return Ok(0);
    }

    let mut file = OpenOptions::new().read(true).write(true).open(path)?;
    let mut end = len;
    let mut buf = vec![0u8; TAIL_CHUNK as usize];

    while end > 0 {
        let start = end.saturating_sub(TAIL_CHUNK);
        let chunk = &mut buf[..(end - start) as usize];
        file.seek(SeekFrom::Start(start))?;
        file.read_exact(chunk)?;

        if let Some(pos) = chunk.iter().rposition(|&b| b == b'\n') {
            end = start + pos as u64 + 1;
            break;
        }
        end = start;
    }

    if end != len {
        tracing::warn!(
            "Discarding {} bytes of a partial row at the end of {}",
            len - end,
            path.display()
        );
        file.set_len(end)?;
        file.sync_data()?;
    }

    Ok(end)
}
