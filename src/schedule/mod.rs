//! Timetable → availability pipeline.
//!
//! Raw rows go through [`parser`], their time labels through [`normalize`],
//! and [`derive`] turns the occupied cells into the full availability grid.
//! Nothing in here performs I/O.

mod derive;
mod error;
pub mod normalize;
pub mod parser;

pub use derive::{derive_availability, derive_snapshot, AvailabilitySnapshot};
pub use error::ParseError;
pub use normalize::NormalizationMiss;
pub use parser::{parse_rows, RawRow, ScheduleRow};
