use crate::model::Weekday;

use super::ParseError;

/// A raw row as handed over by the ingestion adapter.
pub type RawRow = Vec<String>;

/// One timetable row: a time label and the Monday..Friday cells.
///
/// A cell is `None` when it is missing or empty. Whitespace-only cells are
/// kept; the derivation step decides they do not occupy anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRow {
    pub time_label: String,
    pub cells: [Option<String>; Weekday::COUNT],
}

impl ScheduleRow {
    /// Returns `None` for rows without a time label.
    pub fn from_cells(raw: RawRow) -> Option<Self> {
        let mut iter = raw.into_iter();
        let time_label = iter.next()?;
        if time_label.trim().is_empty() {
            return None;
        }
        let mut cells: [Option<String>; Weekday::COUNT] = Default::default();
        for (cell, value) in cells.iter_mut().zip(iter) {
            if !value.is_empty() {
                *cell = Some(value);
            }
        }
        Some(Self { time_label, cells })
    }

    pub fn cell(&self, day: Weekday) -> Option<&str> {
        self.cells[day.index()].as_deref()
    }
}

/// Single-pass iterator over typed rows. The first input row is the header.
pub struct Rows<I> {
    inner: I,
    header_skipped: bool,
}

pub fn parse_rows<I>(raw: I) -> Rows<I::IntoIter>
where
    I: IntoIterator<Item = Result<RawRow, ParseError>>,
{
    Rows {
        inner: raw.into_iter(),
        header_skipped: false,
    }
}

impl<I> Iterator for Rows<I>
where
    I: Iterator<Item = Result<RawRow, ParseError>>,
{
    type Item = Result<ScheduleRow, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let raw = match self.inner.next()? {
                Ok(raw) => raw,
                Err(e) => return Some(Err(e)),
            };
            if !self.header_skipped {
                self.header_skipped = true;
                continue;
            }
            if let Some(row) = ScheduleRow::from_cells(raw) {
                return Some(Ok(row));
            }
        }
    }
}
