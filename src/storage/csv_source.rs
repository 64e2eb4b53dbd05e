//! CSV sources - the comma-separated files tables and matrices load from.

use std::fs::File;
use std::path::{Path, PathBuf};

use csv::{Reader, ReaderBuilder, StringRecord, Trim};

use crate::common::{Error, Result};

/// Reader over the records of a CSV source.
///
/// Records are trimmed and may vary in width, so short rows are reported as
/// [`Error::ShortRow`] with a line number rather than as a CSV error.
pub struct CsvSource {
    path: PathBuf,
    reader: Reader<File>,
    line: usize,
}

impl CsvSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_path(&path)?;
        Ok(Self {
            path,
            reader,
            line: 0,
        })
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 1-based line number of the record most recently read.
    #[inline]
    pub fn line(&self) -> usize {
        self.line
    }

    /// The next raw record, or `None` at end of file.
    pub fn next_record(&mut self) -> Result<Option<StringRecord>> {
        let mut record = StringRecord::new();
        if self.reader.read_record(&mut record)? {
            self.line += 1;
            Ok(Some(record))
        } else {
            Ok(None)
        }
    }

    /// The next record parsed as `width` integers.
    ///
    /// Fields beyond `width` are ignored.
    ///
    /// # Errors
    /// - `Error::ShortRow` if the record has fewer than `width` fields
    /// - `Error::InvalidValue` if a field is not an `i32`
    pub fn next_row(&mut self, width: usize) -> Result<Option<Vec<i32>>> {
        let record = match self.next_record()? {
            Some(record) => record,
            None => return Ok(None),
        };
        parse_row(&record, width, self.line).map(Some)
    }
}

/// Parse the first `width` fields of a record.
pub fn parse_row(record: &StringRecord, width: usize, line: usize) -> Result<Vec<i32>> {
    if record.len() < width {
        return Err(Error::ShortRow {
            line,
            expected: width,
            found: record.len(),
        });
    }
    record
        .iter()
        .take(width)
        .map(|field| {
            field.parse::<i32>().map_err(|_| Error::InvalidValue {
                line,
                value: field.to_string(),
            })
        })
        .collect()
}
