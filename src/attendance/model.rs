use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudentStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub roll_number: String,
    pub class: String,
    pub status: StudentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inactivation_date: Option<NaiveDate>,
}

/// Tri-state mark for one student on one day. `Neutral` only ever exists in
/// memory as the "no entry" state; it is never written to the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mark {
    Present,
    Absent,
    #[default]
    #[serde(other)]
    Neutral,
}

impl Mark {
    /// neutral -> present -> absent -> neutral
    pub fn next(self) -> Mark {
        match self {
            Mark::Neutral => Mark::Present,
            Mark::Present => Mark::Absent,
            Mark::Absent => Mark::Neutral,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mark::Neutral => "neutral",
            Mark::Present => "present",
            Mark::Absent => "absent",
        }
    }

    pub fn parse(raw: &str) -> Option<Mark> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "neutral" | "" => Some(Mark::Neutral),
            "present" => Some(Mark::Present),
            "absent" => Some(Mark::Absent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub status: Mark,
    #[serde(default)]
    pub reason: String,
}

impl AttendanceRecord {
    pub fn present() -> Self {
        Self {
            status: Mark::Present,
            reason: String::new(),
        }
    }

    pub fn absent(reason: impl Into<String>) -> Self {
        Self {
            status: Mark::Absent,
            reason: reason.into(),
        }
    }
}

/// studentId -> record for a single date.
pub type DayRecords = BTreeMap<String, AttendanceRecord>;

/// date -> day records; the whole document exchanged with the backend.
pub type Snapshot = BTreeMap<NaiveDate, DayRecords>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holiday {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub name: String,
}

impl Holiday {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

/// Numeric roll number used for ordering. Localized decimal digits are
/// folded to ASCII; the value is the leading digit run, 0 when absent.
pub fn normalize_roll_number(raw: &str) -> u64 {
    let folded: String = raw.trim().chars().map(fold_digit).collect();
    let digits: String = folded.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return 0;
    }
    digits.parse::<u64>().unwrap_or(0)
}

fn fold_digit(c: char) -> char {
    const ZEROS: [u32; 4] = [
        0x0660, // Arabic-Indic
        0x06F0, // Extended Arabic-Indic
        0x0966, // Devanagari
        0x09E6, // Bengali
    ];
    let cp = c as u32;
    for zero in ZEROS {
        if (zero..zero + 10).contains(&cp) {
            return char::from(b'0' + (cp - zero) as u8);
        }
    }
    c
}
