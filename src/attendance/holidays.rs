use super::model::Holiday;
use chrono::NaiveDate;

#[derive(Debug, Clone, Default)]
pub struct HolidayCalendar {
    holidays: Vec<Holiday>,
}

impl HolidayCalendar {
    pub fn new(holidays: Vec<Holiday>) -> Self {
        Self { holidays }
    }

    pub fn holidays(&self) -> &[Holiday] {
        &self.holidays
    }

    /// First configured range containing `date` wins.
    pub fn holiday_on(&self, date: NaiveDate) -> Option<&Holiday> {
        self.holidays.iter().find(|h| h.contains(date))
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holiday_on(date).is_some()
    }

    pub fn name_of(&self, date: NaiveDate) -> Option<&str> {
        self.holiday_on(date).map(|h| h.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HolidayProblem {
    #[error("holiday #{index} has no name")]
    EmptyName { index: usize },
    #[error("holiday #{index} ends before it starts")]
    InvertedRange { index: usize },
    #[error("holidays #{first} and #{second} overlap")]
    Overlap { first: usize, second: usize },
}

/// Checks a holiday configuration before it is accepted by settings.
pub fn validate_holidays(holidays: &[Holiday]) -> Result<(), HolidayProblem> {
    for (index, h) in holidays.iter().enumerate() {
        if h.name.trim().is_empty() {
            return Err(HolidayProblem::EmptyName { index });
        }
        if h.end_date < h.start_date {
            return Err(HolidayProblem::InvertedRange { index });
        }
    }
    match find_overlap(holidays) {
        Some((first, second)) => Err(HolidayProblem::Overlap { first, second }),
        None => Ok(()),
    }
}

pub fn find_overlap(holidays: &[Holiday]) -> Option<(usize, usize)> {
    for i in 0..holidays.len() {
        for j in (i + 1)..holidays.len() {
            let a = &holidays[i];
            let b = &holidays[j];
            if a.start_date <= b.end_date && b.start_date <= a.end_date {
                return Some((i, j));
            }
        }
    }
    None
}
