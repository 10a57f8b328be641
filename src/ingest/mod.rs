//! Upload adapters: turn a timetable file into raw rows of cell text.

mod delimited;
mod workbook;

pub use delimited::CsvIngestor;
pub use workbook::XlsxIngestor;

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;

use crate::schedule::{ParseError, RawRow};

pub type RowIter = Box<dyn Iterator<Item = Result<RawRow, ParseError>> + Send>;

/// Turns an uploaded file into raw rows of cell text.
pub trait TableIngestor: Send + Sync {
    fn rows(&self, bytes: Bytes) -> Result<RowIter, ParseError>;
}

/// Picks the ingestor for an upload by its file extension.
///
/// `.xlsx` and `.csv` are registered by default. Extensions compare
/// case-insensitively.
#[derive(Clone)]
pub struct TableReader {
    formats: Vec<(String, Arc<dyn TableIngestor>)>,
}

impl Default for TableReader {
    fn default() -> Self {
        Self::empty()
            .with_format("xlsx", XlsxIngestor::new())
            .with_format("csv", CsvIngestor::new())
    }
}

impl TableReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn empty() -> Self {
        Self { formats: Vec::new() }
    }

    /// Register `ingestor` for `extension`, replacing any earlier one.
    pub fn with_format(mut self, extension: &str, ingestor: impl TableIngestor + 'static) -> Self {
        let extension = extension.to_ascii_lowercase();
        let ingestor: Arc<dyn TableIngestor> = Arc::new(ingestor);
        self.formats.retain(|(ext, _)| *ext != extension);
        self.formats.push((extension, ingestor));
        self
    }

    pub fn ingestor_for(&self, file_name: &str) -> Result<&dyn TableIngestor, ParseError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        self.formats
            .iter()
            .find(|(ext, _)| *ext == extension)
            .map(|(_, ingestor)| &**ingestor)
            .ok_or_else(|| ParseError::UnsupportedFormat(file_name.to_string()))
    }

    pub fn rows(&self, file_name: &str, bytes: Bytes) -> Result<RowIter, ParseError> {
        self.ingestor_for(file_name)?.rows(bytes)
    }
}
