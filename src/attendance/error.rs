use chrono::NaiveDate;
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttendanceError {
    #[error("{date} is a holiday ({name}); attendance cannot be changed")]
    HolidayBlocked { date: NaiveDate, name: String },

    #[error("absent students need a reason: {}", names.join(", "))]
    MissingAbsenceReason { names: Vec<String> },

    #[error("{date} is after today ({today})")]
    FutureDateBlocked { date: NaiveDate, today: NaiveDate },

    #[error("{date} is before the academic year start ({start})")]
    BeforeAcademicYear { date: NaiveDate, start: NaiveDate },

    #[error("failed to persist attendance: {0}")]
    PersistenceFailure(String),

    #[error("no eligible students on {date}")]
    EmptyRosterOnDate { date: NaiveDate },

    #[error("student {student_id} is not on the roster for {date}")]
    NotEligible { date: NaiveDate, student_id: String },

    #[error("a reason can only be entered for an absent student ({student_id} on {date})")]
    ReasonRequiresAbsence { date: NaiveDate, student_id: String },

    #[error("neutral entry for {student_id} on {date} must not be persisted")]
    NeutralEntry { date: NaiveDate, student_id: String },
}

impl AttendanceError {
    pub fn code(&self) -> &'static str {
        match self {
            AttendanceError::HolidayBlocked { .. } => "holiday_blocked",
            AttendanceError::MissingAbsenceReason { .. } => "missing_absence_reason",
            AttendanceError::FutureDateBlocked { .. } => "future_date_blocked",
            AttendanceError::BeforeAcademicYear { .. } => "before_academic_year",
            AttendanceError::PersistenceFailure(_) => "persistence_failure",
            AttendanceError::EmptyRosterOnDate { .. } => "empty_roster_on_date",
            AttendanceError::NotEligible { .. } => "not_eligible",
            AttendanceError::ReasonRequiresAbsence { .. } => "reason_requires_absence",
            AttendanceError::NeutralEntry { .. } => "neutral_entry",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            AttendanceError::HolidayBlocked { date, name } => {
                Some(json!({ "date": date, "holiday": name }))
            }
            AttendanceError::MissingAbsenceReason { names } => Some(json!({ "names": names })),
            AttendanceError::FutureDateBlocked { date, today } => {
                Some(json!({ "date": date, "today": today }))
            }
            AttendanceError::BeforeAcademicYear { date, start } => {
                Some(json!({ "date": date, "academicYearStart": start }))
            }
            AttendanceError::EmptyRosterOnDate { date } => Some(json!({ "date": date })),
            AttendanceError::NotEligible { date, student_id }
            | AttendanceError::ReasonRequiresAbsence { date, student_id }
            | AttendanceError::NeutralEntry { date, student_id } => {
                Some(json!({ "date": date, "studentId": student_id }))
            }
            AttendanceError::PersistenceFailure(_) => None,
        }
    }
}
