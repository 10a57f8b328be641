use std::io::Cursor;

use bytes::Bytes;
use calamine::{Data, Reader, Xlsx};

use crate::limits::MAX_UPLOAD_BYTES;
use crate::schedule::{ParseError, RawRow};

use super::{RowIter, TableIngestor};

/// Excel workbooks. Only the first worksheet is read.
///
/// Rows start at the sheet's first used row and column, and every row is as
/// wide as the used range.
#[derive(Debug, Clone)]
pub struct XlsxIngestor {
    max_bytes: usize,
}

impl Default for XlsxIngestor {
    fn default() -> Self {
        Self {
            max_bytes: MAX_UPLOAD_BYTES,
        }
    }
}

impl XlsxIngestor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_bytes(max_bytes: usize) -> Self {
        Self { max_bytes }
    }
}

fn undecodable(reason: impl ToString) -> ParseError {
    ParseError::Undecodable {
        line: None,
        reason: reason.to_string(),
    }
}

/// Cell text as a person would read it off the sheet. Time-formatted cells
/// render as `H:MM`, dropping any date part.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::DateTime(dt) => {
            let minutes = (dt.as_f64().fract() * 1440.0).round() as u32;
            format!("{}:{:02}", minutes / 60 % 24, minutes % 60)
        }
        other => other.to_string(),
    }
}

impl TableIngestor for XlsxIngestor {
    fn rows(&self, bytes: Bytes) -> Result<RowIter, ParseError> {
        if bytes.len() > self.max_bytes {
            return Err(ParseError::TooLarge {
                len: bytes.len(),
                max: self.max_bytes,
            });
        }

        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).map_err(undecodable)?;
        let sheet = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| undecodable("workbook has no worksheets"))?
            .map_err(undecodable)?;

        let rows: Vec<RawRow> = sheet
            .rows()
            .map(|row| row.iter().map(cell_text).collect())
            .collect();
        Ok(Box::new(rows.into_iter().map(Ok)))
    }
}
