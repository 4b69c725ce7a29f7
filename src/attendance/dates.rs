use chrono::{Datelike, Local, NaiveDate};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Source of "today" as a local calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
    System,
    Fixed(NaiveDate),
}

impl Clock {
    pub fn today(&self) -> NaiveDate {
        match self {
            Clock::System => Local::now().date_naive(),
            Clock::Fixed(d) => *d,
        }
    }
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parses `YYYY-MM` into (year, month).
pub fn parse_month_key(raw: &str) -> Option<(i32, u32)> {
    let (y, m) = raw.trim().split_once('-')?;
    let year = y.parse::<i32>().ok()?;
    let month = m.parse::<u32>().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }
    Some((year, month))
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let leap = (year % 4 == 0 && year % 100 != 0) || year % 400 == 0;
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if leap => 29,
        2 => 28,
        _ => 30,
    }
}

/// 0 = Sunday .. 6 = Saturday.
pub fn first_weekday_of_month(year: i32, month: u32) -> Option<u32> {
    NaiveDate::from_ymd_opt(year, month, 1).map(|d| d.weekday().num_days_from_sunday())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_date_rejects_timestamps_and_garbage() {
        assert_eq!(
            parse_date(" 2024-03-09 "),
            NaiveDate::from_ymd_opt(2024, 3, 9)
        );
        assert_eq!(parse_date("2024-03-09T23:30:00Z"), None);
        assert_eq!(parse_date("09/03/2024"), None);
        assert_eq!(parse_date("2024-02-30"), None);
    }

    #[test]
    fn month_key_and_lengths() {
        assert_eq!(parse_month_key("2024-02"), Some((2024, 2)));
        assert_eq!(parse_month_key("2024-13"), None);
        assert_eq!(parse_month_key("march"), None);
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(1900, 2), 28);
        assert_eq!(days_in_month(2000, 2), 29);
        assert_eq!(days_in_month(2024, 4), 30);
    }

    #[test]
    fn first_weekday_is_sunday_based() {
        // 2024-03-01 was a Friday.
        assert_eq!(first_weekday_of_month(2024, 3), Some(5));
        // 2024-09-01 was a Sunday.
        assert_eq!(first_weekday_of_month(2024, 9), Some(0));
    }

    #[test]
    fn fixed_clock_ignores_wall_time() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(Clock::Fixed(d).today(), d);
    }
}
