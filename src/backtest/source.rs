//! Lazy record sources over a delimited market-data feed.
//!
//! A record source is any single-pass iterator of [`FeedRecord`]s. The
//! [`CsvRecordSource`] reads them from a file or any other byte stream and
//! owns that stream, so the handle is released on every exit path by drop.

use crate::backtest::config::BacktestConfig;
use crate::backtest::error::{BacktestError, FeedError};
use csv::{ErrorKind, ReaderBuilder, StringRecordsIntoIter, Trim};
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// One row of the feed, split into string fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedRecord {
    row: u64,
    fields: Vec<String>,
}

impl FeedRecord {
    /// Creates a record for the given 1-based row.
    pub fn new(row: u64, fields: Vec<String>) -> Self {
        Self { row, fields }
    }

    /// Builds a record from string slices.
    pub fn from_fields<S: AsRef<str>>(row: u64, fields: &[S]) -> Self {
        Self::new(row, fields.iter().map(|f| f.as_ref().to_string()).collect())
    }

    /// The 1-based row number of this record in its feed.
    #[must_use]
    pub fn row(&self) -> u64 {
        self.row
    }

    /// The field at `column`, if present.
    #[must_use]
    pub fn get(&self, column: usize) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` for a row without fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// All fields in column order.
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

/// A finite, ordered, single-pass sequence of feed records.
///
/// End of sequence is terminal. Any `Send` iterator with the right item type
/// is a record source, which keeps in-memory feeds trivial to build.
pub trait RecordSource: Iterator<Item = Result<FeedRecord, FeedError>> + Send {}

impl<I> RecordSource for I where I: Iterator<Item = Result<FeedRecord, FeedError>> + Send {}

/// Record source backed by the `csv` crate.
pub struct CsvRecordSource<R: Read> {
    records: StringRecordsIntoIter<R>,
    rows_read: u64,
    finished: bool,
}

impl CsvRecordSource<File> {
    /// Opens the feed at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`BacktestError::FeedOpen`] if the file cannot be opened.
    pub fn from_path(
        path: impl AsRef<Path>,
        config: &BacktestConfig,
    ) -> Result<Self, BacktestError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| BacktestError::FeedOpen {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        info!(path = %path.display(), "opened market-data feed");
        Ok(Self::from_reader(file, config))
    }
}

impl<R: Read> CsvRecordSource<R> {
    /// Wraps any byte stream.
    pub fn from_reader(reader: R, config: &BacktestConfig) -> Self {
        let reader = ReaderBuilder::new()
            .has_headers(config.has_headers)
            .delimiter(config.delimiter)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);
        Self {
            records: reader.into_records(),
            rows_read: 0,
            finished: false,
        }
    }

    /// Number of rows handed out so far, including malformed ones.
    #[must_use]
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }
}

impl<R: Read> Iterator for CsvRecordSource<R> {
    type Item = Result<FeedRecord, FeedError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let Some(next) = self.records.next() else {
            self.finished = true;
            debug!(rows = self.rows_read, "feed exhausted");
            return None;
        };
        self.rows_read += 1;

        match next {
            Ok(record) => {
                let row = record
                    .position()
                    .map_or(self.rows_read, |position| position.line());
                Some(Ok(FeedRecord::new(
                    row,
                    record.iter().map(str::to_string).collect(),
                )))
            }
            Err(err) => {
                let row = err
                    .position()
                    .map_or(self.rows_read, |position| position.line());
                if matches!(err.kind(), ErrorKind::Io(_)) {
                    self.finished = true;
                    Some(Err(FeedError::Io {
                        message: err.to_string(),
                    }))
                } else {
                    Some(Err(FeedError::Malformed {
                        row,
                        message: err.to_string(),
                    }))
                }
            }
        }
    }
}
