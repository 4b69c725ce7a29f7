use super::holidays::HolidayCalendar;
use super::model::{AttendanceRecord, DayRecords, Mark, Student};
use super::store::RecordStore;
use chrono::{Days, NaiveDate};
use std::collections::HashSet;

/// How far back sticky attendance looks for a prior record.
pub const STICKY_WINDOW_DAYS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedOutcome {
    pub records: DayRecords,
    /// Historical dates that contributed at least one copied record.
    pub source_dates: Vec<NaiveDate>,
    pub copied: usize,
    pub defaulted: usize,
}

/// Builds the initial draft for a date with no record by carrying each
/// eligible student's most recent status forward from the last 30 days.
/// Holidays in the window are skipped. Anyone unresolved is `present`.
///
/// The caller is responsible for only seeding non-holiday dates whose store
/// entry is empty.
pub fn seed(
    date: NaiveDate,
    eligible: &[&Student],
    store: &RecordStore,
    holidays: &HolidayCalendar,
) -> SeedOutcome {
    let mut records = DayRecords::new();
    let mut resolved: HashSet<&str> = HashSet::new();
    let mut source_dates = Vec::new();

    for offset in 1..=STICKY_WINDOW_DAYS {
        if resolved.len() == eligible.len() {
            break;
        }
        let Some(candidate) = date.checked_sub_days(Days::new(offset)) else {
            break;
        };
        if holidays.is_holiday(candidate) {
            continue;
        }
        let day = store.get(candidate);
        if day.is_empty() {
            continue;
        }
        let mut contributed = false;
        for student in eligible {
            if resolved.contains(student.id.as_str()) {
                continue;
            }
            let Some(rec) = day.get(&student.id) else {
                continue;
            };
            if rec.status == Mark::Neutral {
                continue;
            }
            records.insert(student.id.clone(), rec.clone());
            resolved.insert(student.id.as_str());
            contributed = true;
        }
        if contributed {
            source_dates.push(candidate);
        }
    }

    let copied = records.len();
    let mut defaulted = 0;
    for student in eligible {
        if !resolved.contains(student.id.as_str()) {
            records.insert(student.id.clone(), AttendanceRecord::present());
            defaulted += 1;
        }
    }

    SeedOutcome {
        records,
        source_dates,
        copied,
        defaulted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::model::{Holiday, StudentStatus};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).expect("valid date")
    }

    fn student(id: &str) -> Student {
        Student {
            id: id.to_string(),
            name: id.to_uppercase(),
            roll_number: String::new(),
            class: "c1".to_string(),
            status: StudentStatus::Active,
            inactivation_date: None,
        }
    }

    #[test]
    fn copies_latest_history_and_defaults_the_rest() {
        let s1 = student("s1");
        let s2 = student("s2");
        let eligible = vec![&s1, &s2];
        let mut store = RecordStore::new();
        store.set_status(d(2024, 3, 12), "s1", Mark::Absent);
        store.set_reason(d(2024, 3, 12), "s1", "sick");

        let out = seed(d(2024, 3, 15), &eligible, &store, &HolidayCalendar::default());
        assert_eq!(out.records["s1"], AttendanceRecord::absent("sick"));
        assert_eq!(out.records["s2"], AttendanceRecord::present());
        assert_eq!(out.source_dates, vec![d(2024, 3, 12)]);
        assert_eq!((out.copied, out.defaulted), (1, 1));
    }

    #[test]
    fn nearest_day_wins_over_older_history() {
        let s1 = student("s1");
        let eligible = vec![&s1];
        let mut store = RecordStore::new();
        store.set_status(d(2024, 3, 14), "s1", Mark::Present);
        store.set_status(d(2024, 3, 10), "s1", Mark::Absent);
        store.set_reason(d(2024, 3, 10), "s1", "trip");

        let out = seed(d(2024, 3, 15), &eligible, &store, &HolidayCalendar::default());
        assert_eq!(out.records["s1"], AttendanceRecord::present());
        assert_eq!(out.source_dates, vec![d(2024, 3, 14)]);
    }

    #[test]
    fn holidays_in_the_window_are_skipped() {
        let s1 = student("s1");
        let eligible = vec![&s1];
        let mut store = RecordStore::new();
        store.set_status(d(2024, 3, 14), "s1", Mark::Absent);
        store.set_reason(d(2024, 3, 14), "s1", "holiday trip");
        store.set_status(d(2024, 3, 13), "s1", Mark::Present);
        let holidays = HolidayCalendar::new(vec![Holiday {
            start_date: d(2024, 3, 14),
            end_date: d(2024, 3, 14),
            name: "Spring".to_string(),
        }]);

        let out = seed(d(2024, 3, 15), &eligible, &store, &holidays);
        assert_eq!(out.records["s1"], AttendanceRecord::present());
        assert_eq!(out.source_dates, vec![d(2024, 3, 13)]);
    }

    #[test]
    fn window_is_thirty_days_inclusive() {
        let s1 = student("s1");
        let s2 = student("s2");
        let eligible = vec![&s1, &s2];
        let mut store = RecordStore::new();
        // Exactly 30 days back is inside the window, 31 is outside.
        store.set_status(d(2024, 2, 14), "s1", Mark::Absent);
        store.set_reason(d(2024, 2, 14), "s1", "flu");
        store.set_status(d(2024, 2, 13), "s2", Mark::Absent);
        store.set_reason(d(2024, 2, 13), "s2", "flu");

        let out = seed(d(2024, 3, 15), &eligible, &store, &HolidayCalendar::default());
        assert_eq!(out.records["s1"], AttendanceRecord::absent("flu"));
        assert_eq!(out.records["s2"], AttendanceRecord::present());
    }

    #[test]
    fn empty_history_defaults_everyone_present() {
        let s1 = student("s1");
        let s2 = student("s2");
        let eligible = vec![&s1, &s2];
        let out = seed(
            d(2024, 3, 15),
            &eligible,
            &RecordStore::new(),
            &HolidayCalendar::default(),
        );
        assert!(out.source_dates.is_empty());
        assert_eq!(out.defaulted, 2);
        assert!(out
            .records
            .values()
            .all(|r| *r == AttendanceRecord::present()));
    }

    #[test]
    fn history_for_students_no_longer_eligible_is_ignored() {
        let s1 = student("s1");
        let eligible = vec![&s1];
        let mut store = RecordStore::new();
        store.set_status(d(2024, 3, 14), "gone", Mark::Absent);

        let out = seed(d(2024, 3, 15), &eligible, &store, &HolidayCalendar::default());
        assert_eq!(out.records.len(), 1);
        assert!(out.source_dates.is_empty());
    }
}
