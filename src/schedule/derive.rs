use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::catalog::TimeGrid;
use crate::model::*;

use super::normalize::{occupied_entries, NormalizationMiss};
use super::parser::{parse_rows, RawRow};
use super::ParseError;

/// Everything one upload derives. Replaces the previous snapshot wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilitySnapshot {
    pub occupied: Vec<OccupiedEntry>,
    /// Exactly one entry per catalog cell, slot-major.
    pub slots: Vec<AvailabilitySlot>,
    pub misses: Vec<NormalizationMiss>,
}

impl AvailabilitySnapshot {
    pub fn available(&self) -> impl Iterator<Item = &AvailabilitySlot> {
        self.slots.iter().filter(|s| s.is_available())
    }

    pub fn booked(&self) -> impl Iterator<Item = &AvailabilitySlot> {
        self.slots.iter().filter(|s| !s.is_available())
    }
}

/// Classify every cell of the grid.
///
/// A cell is booked when some entry targets exactly that (day, slot) and its
/// label is non-blank after trimming. Everything else is available. When
/// several entries hit one cell, the first non-blank label wins.
pub fn derive_availability(grid: &TimeGrid, occupied: &[OccupiedEntry]) -> Vec<AvailabilitySlot> {
    let mut booked: HashMap<(Weekday, &str), &str> = HashMap::with_capacity(occupied.len());
    for entry in occupied {
        let label = entry.label.trim();
        if label.is_empty() {
            continue;
        }
        booked.entry((entry.day, entry.slot.as_str())).or_insert(label);
    }

    grid.cells()
        .map(|(day, slot)| match booked.get(&(day, slot.as_str())) {
            Some(&subject) => AvailabilitySlot::booked(day, slot.clone(), subject),
            None => AvailabilitySlot::available(day, slot.clone()),
        })
        .collect()
}

/// Raw rows → parse → normalize → derive, all or nothing.
///
/// Any decode error aborts the whole derivation; unmatched time labels do not.
pub fn derive_snapshot<I>(grid: &TimeGrid, raw: I) -> Result<AvailabilitySnapshot, ParseError>
where
    I: IntoIterator<Item = Result<RawRow, ParseError>>,
{
    let mut occupied = Vec::new();
    let mut misses = Vec::new();

    for row in parse_rows(raw) {
        match occupied_entries(grid, row?) {
            Ok(entries) => occupied.extend(entries),
            Err(miss) => misses.push(miss),
        }
    }

    let slots = derive_availability(grid, &occupied);
    Ok(AvailabilitySnapshot {
        occupied,
        slots,
        misses,
    })
}
