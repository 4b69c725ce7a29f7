use super::dates::{days_in_month, first_weekday_of_month};
use super::saved_index::SavedDateIndex;
use super::store::RecordStore;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DayCategory {
    Empty,
    BeforeAcademicYear,
    AttendanceTaken,
    FutureDay,
    AttendanceMissed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarCell {
    Padding,
    Day(NaiveDate),
}

/// Holidays are not a category here; they only surface when
/// a date is opened for editing.
pub struct CalendarClassifier<'a> {
    pub saved: &'a SavedDateIndex,
    pub academic_year_start: Option<NaiveDate>,
    pub today: NaiveDate,
}

impl<'a> CalendarClassifier<'a> {
    pub fn classify(&self, cell: CalendarCell) -> DayCategory {
        let date = match cell {
            CalendarCell::Padding => return DayCategory::Empty,
            CalendarCell::Day(date) => date,
        };
        if matches!(self.academic_year_start, Some(start) if date < start) {
            return DayCategory::BeforeAcademicYear;
        }
        if self.saved.is_saved(date) {
            return DayCategory::AttendanceTaken;
        }
        if date > self.today {
            return DayCategory::FutureDay;
        }
        DayCategory::AttendanceMissed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDayView {
    /// 0 for padding cells.
    pub day: u32,
    pub date: Option<NaiveDate>,
    pub category: DayCategory,
    pub has_draft: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthView {
    pub year: i32,
    pub month: u32,
    pub first_weekday: u32,
    pub days: Vec<CalendarDayView>,
}

/// Sunday-first grid, padded to whole weeks.
pub fn month_cells(year: i32, month: u32) -> Option<Vec<CalendarCell>> {
    let first = first_weekday_of_month(year, month)?;
    let mut cells = Vec::new();
    for _ in 0..first {
        cells.push(CalendarCell::Padding);
    }
    for day in 1..=days_in_month(year, month) {
        cells.push(CalendarCell::Day(NaiveDate::from_ymd_opt(year, month, day)?));
    }
    while cells.len() % 7 != 0 {
        cells.push(CalendarCell::Padding);
    }
    Some(cells)
}

pub fn month_view(
    year: i32,
    month: u32,
    classifier: &CalendarClassifier<'_>,
    store: &RecordStore,
) -> Option<MonthView> {
    let cells = month_cells(year, month)?;
    let days = cells
        .into_iter()
        .map(|cell| {
            let category = classifier.classify(cell);
            match cell {
                CalendarCell::Padding => CalendarDayView {
                    day: 0,
                    date: None,
                    category,
                    has_draft: false,
                },
                CalendarCell::Day(date) => CalendarDayView {
                    day: chrono::Datelike::day(&date),
                    date: Some(date),
                    category,
                    has_draft: store.has_records(date) && !classifier.saved.is_saved(date),
                },
            }
        })
        .collect();
    Some(MonthView {
        year,
        month,
        first_weekday: first_weekday_of_month(year, month)?,
        days,
    })
}
