use super::error::AttendanceError;
use super::holidays::HolidayCalendar;
use super::model::{DayRecords, Mark, Student};
use super::store::{strip_neutral_entries, RecordStore};
use chrono::NaiveDate;
use std::collections::HashMap;

/// Gatekeeper for every draft edit and for the save payload. A rejected
/// call leaves the store untouched.
pub struct EditValidator<'a> {
    pub holidays: &'a HolidayCalendar,
    pub today: NaiveDate,
    pub academic_year_start: Option<NaiveDate>,
}

impl<'a> EditValidator<'a> {
    /// Holiday, academic-year and future-date checks, in that order.
    pub fn check_editable(&self, date: NaiveDate) -> Result<(), AttendanceError> {
        if let Some(name) = self.holidays.name_of(date) {
            return Err(AttendanceError::HolidayBlocked {
                date,
                name: name.to_string(),
            });
        }
        self.check_navigable(date)
    }

    /// Bounds that apply even to read-only navigation.
    pub fn check_navigable(&self, date: NaiveDate) -> Result<(), AttendanceError> {
        if let Some(start) = self.academic_year_start {
            if date < start {
                return Err(AttendanceError::BeforeAcademicYear { date, start });
            }
        }
        if date > self.today {
            return Err(AttendanceError::FutureDateBlocked {
                date,
                today: self.today,
            });
        }
        Ok(())
    }

    pub fn toggle(
        &self,
        store: &mut RecordStore,
        date: NaiveDate,
        student: &Student,
    ) -> Result<Mark, AttendanceError> {
        self.check_editable(date)?;
        let next = store.mark_of(date, &student.id).next();
        store.set_status(date, &student.id, next);
        Ok(next)
    }

    /// Blank text is accepted here; it only blocks the save.
    pub fn set_reason(
        &self,
        store: &mut RecordStore,
        date: NaiveDate,
        student: &Student,
        text: &str,
    ) -> Result<(), AttendanceError> {
        self.check_editable(date)?;
        if store.mark_of(date, &student.id) != Mark::Absent {
            return Err(AttendanceError::ReasonRequiresAbsence {
                date,
                student_id: student.id.clone(),
            });
        }
        store.set_reason(date, &student.id, text);
        Ok(())
    }

    /// Builds the payload for `date`: neutral entries stripped, every
    /// absence carrying a non-blank reason.
    pub fn validate_for_save(
        &self,
        store: &RecordStore,
        date: NaiveDate,
        roster: &[Student],
    ) -> Result<DayRecords, AttendanceError> {
        self.check_editable(date)?;

        let mut payload = store.get(date).clone();
        strip_neutral_entries(&mut payload);

        let names: HashMap<&str, &str> = roster
            .iter()
            .map(|s| (s.id.as_str(), s.name.as_str()))
            .collect();
        let missing: Vec<String> = payload
            .iter()
            .filter(|(_, r)| r.status == Mark::Absent && r.reason.trim().is_empty())
            .map(|(id, _)| {
                names
                    .get(id.as_str())
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| id.clone())
            })
            .collect();
        if !missing.is_empty() {
            return Err(AttendanceError::MissingAbsenceReason { names: missing });
        }
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::model::{AttendanceRecord, Holiday, StudentStatus};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).expect("valid date")
    }

    fn student(id: &str, name: &str) -> Student {
        Student {
            id: id.to_string(),
            name: name.to_string(),
            roll_number: "1".to_string(),
            class: "c1".to_string(),
            status: StudentStatus::Active,
            inactivation_date: None,
        }
    }

    fn holidays() -> HolidayCalendar {
        HolidayCalendar::new(vec![Holiday {
            start_date: d(2024, 3, 11),
            end_date: d(2024, 3, 11),
            name: "Founders Day".to_string(),
        }])
    }

    #[test]
    fn toggle_walks_the_cycle() {
        let cal = HolidayCalendar::default();
        let v = EditValidator {
            holidays: &cal,
            today: d(2024, 3, 15),
            academic_year_start: None,
        };
        let s1 = student("s1", "Amina");
        let mut store = RecordStore::new();
        let date = d(2024, 3, 15);
        assert_eq!(v.toggle(&mut store, date, &s1), Ok(Mark::Present));
        assert_eq!(v.toggle(&mut store, date, &s1), Ok(Mark::Absent));
        assert_eq!(v.toggle(&mut store, date, &s1), Ok(Mark::Neutral));
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn holiday_blocks_every_edit_without_mutation() {
        let cal = holidays();
        let v = EditValidator {
            holidays: &cal,
            today: d(2024, 3, 15),
            academic_year_start: None,
        };
        let s1 = student("s1", "Amina");
        let date = d(2024, 3, 11);
        let mut store = RecordStore::new();
        let before = store.clone();

        let blocked = AttendanceError::HolidayBlocked {
            date,
            name: "Founders Day".to_string(),
        };
        assert_eq!(v.toggle(&mut store, date, &s1), Err(blocked.clone()));
        assert_eq!(
            v.set_reason(&mut store, date, &s1, "sick"),
            Err(blocked.clone())
        );
        assert_eq!(
            v.validate_for_save(&store, date, &[s1.clone()]),
            Err(blocked)
        );
        assert_eq!(store, before);
    }

    #[test]
    fn reason_only_for_absent_records() {
        let cal = HolidayCalendar::default();
        let v = EditValidator {
            holidays: &cal,
            today: d(2024, 3, 15),
            academic_year_start: None,
        };
        let s1 = student("s1", "Amina");
        let date = d(2024, 3, 15);
        let mut store = RecordStore::new();
        store.set_status(date, "s1", Mark::Present);
        assert!(matches!(
            v.set_reason(&mut store, date, &s1, "late bus"),
            Err(AttendanceError::ReasonRequiresAbsence { .. })
        ));
        store.set_status(date, "s1", Mark::Absent);
        assert_eq!(v.set_reason(&mut store, date, &s1, "   "), Ok(()));
        assert_eq!(store.get(date)["s1"].reason, "   ");
    }

    #[test]
    fn save_requires_trimmed_reasons_and_reports_names() {
        let cal = HolidayCalendar::default();
        let v = EditValidator {
            holidays: &cal,
            today: d(2024, 3, 15),
            academic_year_start: None,
        };
        let roster = vec![student("s1", "Amina"), student("s2", "Bilal")];
        let date = d(2024, 3, 15);
        let mut store = RecordStore::new();
        store.set_status(date, "s1", Mark::Absent);
        store.set_reason(date, "s1", " \t");
        store.set_status(date, "s2", Mark::Absent);
        store.set_reason(date, "s2", "dentist");
        let before = store.clone();

        assert_eq!(
            v.validate_for_save(&store, date, &roster),
            Err(AttendanceError::MissingAbsenceReason {
                names: vec!["Amina".to_string()]
            })
        );
        assert_eq!(store, before);

        store.set_reason(date, "s1", "sick");
        let payload = v.validate_for_save(&store, date, &roster).expect("valid");
        assert_eq!(payload["s1"], AttendanceRecord::absent("sick"));
    }

    #[test]
    fn future_and_pre_year_dates_are_rejected() {
        let cal = HolidayCalendar::default();
        let v = EditValidator {
            holidays: &cal,
            today: d(2024, 3, 15),
            academic_year_start: Some(d(2024, 1, 1)),
        };
        assert!(matches!(
            v.check_editable(d(2024, 3, 16)),
            Err(AttendanceError::FutureDateBlocked { .. })
        ));
        assert!(matches!(
            v.check_editable(d(2023, 12, 31)),
            Err(AttendanceError::BeforeAcademicYear { .. })
        ));
        assert_eq!(v.check_editable(d(2024, 1, 1)), Ok(()));
        assert_eq!(v.check_editable(d(2024, 3, 15)), Ok(()));
    }
}
