use super::model::{Mark, Student};
use super::roster::{eligible_on, ClassRegistry};
use super::store::RecordStore;
use chrono::NaiveDate;
use serde::Serialize;

/// One displayed/editable line of the register for a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRow {
    pub student_id: String,
    pub name: String,
    pub roll_number: String,
    pub class: String,
    pub status: Mark,
    pub reason: String,
}

impl RegisterRow {
    fn new(student: &Student, status: Mark, reason: String) -> Self {
        Self {
            student_id: student.id.clone(),
            name: student.name.clone(),
            roll_number: student.roll_number.clone(),
            class: student.class.clone(),
            status,
            reason,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DaySummary {
    pub present: usize,
    pub absent: usize,
    pub neutral: usize,
}

/// Eligible students for `date` joined with the store; no entry is neutral.
pub fn rows_for(
    date: NaiveDate,
    roster: &[Student],
    classes: &ClassRegistry,
    store: &RecordStore,
) -> Vec<RegisterRow> {
    let day = store.get(date);
    eligible_on(date, roster, classes)
        .into_iter()
        .map(|s| match day.get(&s.id) {
            Some(rec) => RegisterRow::new(s, rec.status, rec.reason.clone()),
            None => RegisterRow::new(s, Mark::Neutral, String::new()),
        })
        .collect()
}

pub fn summarize(rows: &[RegisterRow]) -> DaySummary {
    let mut summary = DaySummary::default();
    for row in rows {
        match row.status {
            Mark::Present => summary.present += 1,
            Mark::Absent => summary.absent += 1,
            Mark::Neutral => summary.neutral += 1,
        }
    }
    summary
}
