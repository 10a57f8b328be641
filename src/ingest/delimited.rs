use std::io::Cursor;

use bytes::Bytes;

use crate::limits::MAX_UPLOAD_BYTES;
use crate::schedule::ParseError;

use super::{RowIter, TableIngestor};

/// Comma-separated timetables. Rows may have any number of cells.
#[derive(Debug, Clone)]
pub struct CsvIngestor {
    max_bytes: usize,
}

impl Default for CsvIngestor {
    fn default() -> Self {
        Self {
            max_bytes: MAX_UPLOAD_BYTES,
        }
    }
}

impl CsvIngestor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_bytes(max_bytes: usize) -> Self {
        Self { max_bytes }
    }
}

impl TableIngestor for CsvIngestor {
    fn rows(&self, bytes: Bytes) -> Result<RowIter, ParseError> {
        if bytes.len() > self.max_bytes {
            return Err(ParseError::TooLarge {
                len: bytes.len(),
                max: self.max_bytes,
            });
        }
        if bytes.contains(&0) {
            return Err(ParseError::BinaryContent);
        }
        if let Err(e) = std::str::from_utf8(&bytes) {
            return Err(ParseError::Undecodable {
                line: None,
                reason: e.to_string(),
            });
        }

        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(Cursor::new(bytes));

        Ok(Box::new(reader.into_records().map(|record| {
            record
                .map(|r| r.iter().map(str::to_string).collect())
                .map_err(ParseError::from)
        })))
    }
}
