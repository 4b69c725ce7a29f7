use super::error::AttendanceError;
use super::model::{AttendanceRecord, DayRecords, Mark, Snapshot};
use chrono::NaiveDate;

static EMPTY_DAY: DayRecords = DayRecords::new();

/// In-memory attendance document: every loaded date plus the draft for the
/// date being edited. Mutations are single-entry upserts/deletes or a
/// wholesale replace; there is no partial merge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordStore {
    days: Snapshot,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut store = Self::new();
        store.replace_all(snapshot);
        store
    }

    pub fn get(&self, date: NaiveDate) -> &DayRecords {
        self.days.get(&date).unwrap_or(&EMPTY_DAY)
    }

    pub fn has_records(&self, date: NaiveDate) -> bool {
        !self.get(date).is_empty()
    }

    pub fn mark_of(&self, date: NaiveDate, student_id: &str) -> Mark {
        self.get(date)
            .get(student_id)
            .map(|r| r.status)
            .unwrap_or(Mark::Neutral)
    }

    /// Neutral deletes the entry; present clears the reason; absent keeps
    /// any reason already entered.
    pub fn set_status(&mut self, date: NaiveDate, student_id: &str, mark: Mark) {
        match mark {
            Mark::Neutral => {
                if let Some(day) = self.days.get_mut(&date) {
                    day.remove(student_id);
                    if day.is_empty() {
                        self.days.remove(&date);
                    }
                }
            }
            Mark::Present => {
                self.days
                    .entry(date)
                    .or_default()
                    .insert(student_id.to_string(), AttendanceRecord::present());
            }
            Mark::Absent => {
                let day = self.days.entry(date).or_default();
                let reason = day
                    .get(student_id)
                    .map(|r| r.reason.clone())
                    .unwrap_or_default();
                day.insert(student_id.to_string(), AttendanceRecord::absent(reason));
            }
        }
    }

    /// Returns false when there is no record to attach the reason to.
    pub fn set_reason(&mut self, date: NaiveDate, student_id: &str, reason: &str) -> bool {
        match self
            .days
            .get_mut(&date)
            .and_then(|day| day.get_mut(student_id))
        {
            Some(rec) => {
                rec.reason = reason.to_string();
                true
            }
            None => false,
        }
    }

    /// Installs a whole day (seeded draft or validated payload).
    pub fn set_day(&mut self, date: NaiveDate, records: DayRecords) {
        if records.is_empty() {
            self.days.remove(&date);
        } else {
            self.days.insert(date, records);
        }
    }

    pub fn remove_date(&mut self, date: NaiveDate) -> Option<DayRecords> {
        self.days.remove(&date)
    }

    pub fn replace_all(&mut self, snapshot: Snapshot) {
        self.days = snapshot;
        self.days.retain(|_, day| !day.is_empty());
    }

    pub fn clear(&mut self) {
        self.days.clear();
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.days
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.days.keys().copied()
    }
}

/// Removes neutral entries from a day, returning the affected student ids.
pub fn strip_neutral_entries(day: &mut DayRecords) -> Vec<String> {
    let stripped: Vec<String> = day
        .iter()
        .filter(|(_, r)| r.status == Mark::Neutral)
        .map(|(id, _)| id.clone())
        .collect();
    for id in &stripped {
        day.remove(id);
    }
    stripped
}

/// Removes neutral entries and empty days from a whole snapshot.
pub fn strip_neutral_snapshot(snapshot: &mut Snapshot) -> usize {
    let mut count = 0;
    for day in snapshot.values_mut() {
        count += strip_neutral_entries(day).len();
    }
    snapshot.retain(|_, day| !day.is_empty());
    count
}

/// Guard run before every persistence call.
pub fn assert_no_neutral_entries(snapshot: &Snapshot) -> Result<(), AttendanceError> {
    for (date, day) in snapshot {
        if let Some((student_id, _)) = day.iter().find(|(_, r)| r.status == Mark::Neutral) {
            return Err(AttendanceError::NeutralEntry {
                date: *date,
                student_id: student_id.clone(),
            });
        }
    }
    Ok(())
}
