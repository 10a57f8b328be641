use crate::catalog::TimeGrid;
use crate::model::{OccupiedEntry, TimeSlotLabel};

use super::parser::ScheduleRow;

/// Hours 1..=6 in a raw label are read as afternoon hours.
const PM_HOURS: std::ops::RangeInclusive<u32> = 1..=6;

/// A raw time label that did not land on any catalog slot.
///
/// Tolerated: the row contributes nothing and its cells stay available.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NormalizationMiss {
    pub raw: String,
    /// `None` when the label could not even be split into `H:MM-H:MM`.
    pub normalized: Option<String>,
}

/// Rewrite a raw label into 24-hour form.
///
/// Each endpoint's hour is shifted by 12 when it falls in 1..=6; minutes are
/// kept verbatim and the leading zero on the hour is dropped. This is a
/// heuristic for a 7:00-18:30 operating window, not a real 12/24-hour parse.
///
/// Whitespace around the whole label is ignored. Whitespace inside it is not,
/// so `7:00 - 7:30` has no normal form.
pub fn normalize_label(raw: &str) -> Option<String> {
    let (start, end) = raw.trim().split_once('-')?;
    Some(format!(
        "{}-{}",
        normalize_endpoint(start)?,
        normalize_endpoint(end)?
    ))
}

fn normalize_endpoint(endpoint: &str) -> Option<String> {
    let (hour, minutes) = endpoint.split_once(':')?;
    if hour.is_empty() || !hour.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hour: u32 = hour.parse().ok()?;
    let hour = if PM_HOURS.contains(&hour) { hour + 12 } else { hour };
    Some(format!("{hour}:{minutes}"))
}

/// Resolve a raw label against the catalog.
pub fn resolve<'g>(grid: &'g TimeGrid, raw: &str) -> Result<&'g TimeSlotLabel, NormalizationMiss> {
    let normalized = normalize_label(raw);
    match normalized.as_deref().and_then(|n| grid.lookup(n)) {
        Some(slot) => Ok(slot),
        None => Err(NormalizationMiss {
            raw: raw.to_string(),
            normalized,
        }),
    }
}

/// Turn a row into its occupied entries, restricted to the catalog's days.
pub fn occupied_entries(
    grid: &TimeGrid,
    row: ScheduleRow,
) -> Result<Vec<OccupiedEntry>, NormalizationMiss> {
    let slot = resolve(grid, &row.time_label)?.clone();
    Ok(grid
        .days()
        .iter()
        .filter_map(|&day| {
            row.cell(day).map(|label| OccupiedEntry {
                day,
                slot: slot.clone(),
                label: label.to_string(),
            })
        })
        .collect())
}
