use super::model::Snapshot;
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// Dates the client believes the backend holds a non-empty record for.
/// Derived from the last load/save; not authoritative.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavedDateIndex {
    dates: BTreeSet<NaiveDate>,
}

impl SavedDateIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            dates: snapshot
                .iter()
                .filter(|(_, day)| !day.is_empty())
                .map(|(date, _)| *date)
                .collect(),
        }
    }

    pub fn mark_saved(&mut self, date: NaiveDate) {
        self.dates.insert(date);
    }

    pub fn unmark(&mut self, date: NaiveDate) -> bool {
        self.dates.remove(&date)
    }

    pub fn is_saved(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }

    /// Saved dates strictly after `date`, ascending.
    pub fn saved_after(&self, date: NaiveDate) -> Vec<NaiveDate> {
        use std::ops::Bound::{Excluded, Unbounded};
        self.dates.range((Excluded(date), Unbounded)).copied().collect()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.dates.iter().copied()
    }

    pub fn clear(&mut self) {
        self.dates.clear();
    }
}
