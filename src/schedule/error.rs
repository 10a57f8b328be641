/// The uploaded table could not be read as a table at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Input contains NUL bytes; almost certainly a binary file.
    BinaryContent,
    TooLarge { len: usize, max: usize },
    Undecodable { line: Option<u64>, reason: String },
    /// No ingestor is registered for the upload's file extension.
    UnsupportedFormat(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::BinaryContent => write!(f, "timetable is not a text table"),
            ParseError::TooLarge { len, max } => {
                write!(f, "timetable too large: {len} bytes (max {max})")
            }
            ParseError::Undecodable {
                line: Some(line),
                reason,
            } => write!(f, "cannot read timetable at line {line}: {reason}"),
            ParseError::Undecodable { line: None, reason } => {
                write!(f, "cannot read timetable: {reason}")
            }
            ParseError::UnsupportedFormat(name) => {
                write!(f, "unsupported timetable format: {name}")
            }
        }
    }
}

impl std::error::Error for ParseError {}

impl From<csv::Error> for ParseError {
    fn from(e: csv::Error) -> Self {
        ParseError::Undecodable {
            line: e.position().map(|p| p.line()),
            reason: e.to_string(),
        }
    }
}
