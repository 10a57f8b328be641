use std::collections::HashSet;

use crate::model::{TimeSlotLabel, Weekday};

/// First slot starts at 7:00.
pub const DAY_START_MINUTE: u32 = 7 * 60;
/// Last slot ends at 17:00.
pub const DAY_END_MINUTE: u32 = 17 * 60;
pub const SLOT_MINUTES: u32 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    Empty,
    DuplicateDay(Weekday),
    DuplicateSlot(TimeSlotLabel),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::Empty => write!(f, "catalog needs at least one day and one slot"),
            CatalogError::DuplicateDay(day) => write!(f, "duplicate day in catalog: {day}"),
            CatalogError::DuplicateSlot(slot) => write!(f, "duplicate slot in catalog: {slot}"),
        }
    }
}

impl std::error::Error for CatalogError {}

/// The fixed day × slot vocabulary every schedule is normalized against.
///
/// One instance is shared by the normalizer and the derivation step; a label
/// that is not in here simply does not exist as far as availability goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeGrid {
    days: Vec<Weekday>,
    slots: Vec<TimeSlotLabel>,
    known: HashSet<TimeSlotLabel>,
}

impl Default for TimeGrid {
    fn default() -> Self {
        Self::standard()
    }
}

impl TimeGrid {
    /// Monday–Friday, 7:00–17:00 in half-hour slots.
    pub fn standard() -> Self {
        let slots = (DAY_START_MINUTE..DAY_END_MINUTE)
            .step_by(SLOT_MINUTES as usize)
            .map(|start| TimeSlotLabel::new(slot_label(start, start + SLOT_MINUTES)))
            .collect::<Vec<_>>();
        let known = slots.iter().cloned().collect();
        Self {
            days: Weekday::ALL.to_vec(),
            slots,
            known,
        }
    }

    /// Build a reduced catalog. Order is preserved as given.
    pub fn new(days: Vec<Weekday>, slots: Vec<TimeSlotLabel>) -> Result<Self, CatalogError> {
        if days.is_empty() || slots.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut seen_days = HashSet::new();
        for &day in &days {
            if !seen_days.insert(day) {
                return Err(CatalogError::DuplicateDay(day));
            }
        }
        let mut known = HashSet::with_capacity(slots.len());
        for slot in &slots {
            if !known.insert(slot.clone()) {
                return Err(CatalogError::DuplicateSlot(slot.clone()));
            }
        }
        Ok(Self { days, slots, known })
    }

    pub fn days(&self) -> &[Weekday] {
        &self.days
    }

    pub fn slots(&self) -> &[TimeSlotLabel] {
        &self.slots
    }

    pub fn contains_day(&self, day: Weekday) -> bool {
        self.days.contains(&day)
    }

    /// Exact, character-for-character lookup.
    pub fn lookup(&self, label: &str) -> Option<&TimeSlotLabel> {
        self.known.get(&TimeSlotLabel::new(label))
    }

    /// Number of (day, slot) cells.
    pub fn len(&self) -> usize {
        self.days.len() * self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every cell, slot-major: all days of the first slot, then the next slot.
    pub fn cells(&self) -> impl Iterator<Item = (Weekday, &TimeSlotLabel)> {
        self.slots
            .iter()
            .flat_map(move |slot| self.days.iter().map(move |&day| (day, slot)))
    }
}

fn slot_label(start: u32, end: u32) -> String {
    format!("{}:{:02}-{}:{:02}", start / 60, start % 60, end / 60, end % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_bounds() {
        let grid = TimeGrid::standard();
        assert_eq!(grid.slots().len(), 20);
        assert_eq!(grid.slots()[0].as_str(), "7:00-7:30");
        assert_eq!(grid.slots()[5].as_str(), "9:30-10:00");
        assert_eq!(grid.slots()[12].as_str(), "13:00-13:30");
        assert_eq!(grid.slots()[19].as_str(), "16:30-17:00");
        assert_eq!(grid.days(), &Weekday::ALL);
        assert_eq!(grid.len(), 100);
    }

    #[test]
    fn standard_catalog_is_gapless() {
        let grid = TimeGrid::standard();
        for pair in grid.slots().windows(2) {
            let (_, prev_end) = pair[0].as_str().split_once('-').unwrap();
            let (next_start, _) = pair[1].as_str().split_once('-').unwrap();
            assert_eq!(prev_end, next_start);
        }
    }

    #[test]
    fn lookup_is_exact() {
        let grid = TimeGrid::standard();
        assert!(grid.lookup("8:00-8:30").is_some());
        assert!(grid.lookup("08:00-08:30").is_none());
        assert!(grid.lookup(" 8:00-8:30").is_none());
        assert!(grid.lookup("17:00-17:30").is_none());
    }

    #[test]
    fn cells_are_slot_major() {
        let grid = TimeGrid::new(
            vec![Weekday::Monday, Weekday::Tuesday],
            vec!["7:00-7:30".into(), "7:30-8:00".into()],
        )
        .unwrap();
        let cells: Vec<_> = grid
            .cells()
            .map(|(d, s)| (d, s.as_str().to_string()))
            .collect();
        assert_eq!(
            cells,
            vec![
                (Weekday::Monday, "7:00-7:30".to_string()),
                (Weekday::Tuesday, "7:00-7:30".to_string()),
                (Weekday::Monday, "7:30-8:00".to_string()),
                (Weekday::Tuesday, "7:30-8:00".to_string()),
            ]
        );
    }

    #[test]
    fn cells_restart() {
        let grid = TimeGrid::standard();
        assert_eq!(grid.cells().count(), grid.cells().count());
    }

    #[test]
    fn duplicate_slot_rejected() {
        let result = TimeGrid::new(
            vec![Weekday::Monday],
            vec!["7:00-7:30".into(), "7:00-7:30".into()],
        );
        assert_eq!(result, Err(CatalogError::DuplicateSlot("7:00-7:30".into())));
    }

    #[test]
    fn duplicate_day_rejected() {
        let result = TimeGrid::new(
            vec![Weekday::Monday, Weekday::Monday],
            vec!["7:00-7:30".into()],
        );
        assert_eq!(result, Err(CatalogError::DuplicateDay(Weekday::Monday)));
    }

    #[test]
    fn empty_catalog_rejected() {
        assert_eq!(TimeGrid::new(vec![], vec!["7:00-7:30".into()]), Err(CatalogError::Empty));
    }
}
