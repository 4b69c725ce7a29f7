use super::calendar::{month_view, CalendarClassifier, MonthView};
use super::cleanup::cleanup_auto_applied;
use super::dates::Clock;
use super::eligibility::{rows_for, summarize, DaySummary, RegisterRow};
use super::error::AttendanceError;
use super::gateway::PersistenceGateway;
use super::holidays::HolidayCalendar;
use super::model::{Holiday, Mark, Snapshot, Student};
use super::roster::{eligible_on, is_eligible_on, ClassRegistry};
use super::saved_index::SavedDateIndex;
use super::sticky::seed;
use super::store::{assert_no_neutral_entries, strip_neutral_snapshot, RecordStore};
use super::validate::EditValidator;
use chrono::{DateTime, Local, NaiveDate};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedInfo {
    pub source_dates: Vec<NaiveDate>,
    pub copied: usize,
    pub defaulted: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayView {
    pub date: NaiveDate,
    /// Set when the date is a holiday; the day is then read-only.
    pub holiday: Option<String>,
    pub saved: bool,
    pub seeded: Option<SeedInfo>,
    pub summary: DaySummary,
    pub rows: Vec<RegisterRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadSummary {
    pub dates: usize,
    pub saved_dates: usize,
    pub stripped_neutral: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOutcome {
    pub date: NaiveDate,
    pub entries: usize,
    pub cleaned_up: Vec<NaiveDate>,
    pub cleanup_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub session_id: String,
    pub today: NaiveDate,
    pub last_loaded_at: Option<String>,
    pub academic_year_start: Option<NaiveDate>,
    pub saved_dates: Vec<NaiveDate>,
    pub draft_dates: Vec<NaiveDate>,
}

/// Owns the draft store and saved-date index for one client, together with
/// the read-only roster/holiday/settings snapshots they are evaluated
/// against.
pub struct AttendanceSession<G: PersistenceGateway> {
    gateway: G,
    store: RecordStore,
    saved: SavedDateIndex,
    roster: Vec<Student>,
    classes: ClassRegistry,
    holidays: HolidayCalendar,
    academic_year_start: Option<NaiveDate>,
    clock: Clock,
    session_id: Uuid,
    // Marker for a future optimistic-concurrency protocol; nothing checks it yet.
    last_loaded_at: Option<DateTime<Local>>,
}

impl<G: PersistenceGateway> AttendanceSession<G> {
    pub fn new(gateway: G, clock: Clock) -> Self {
        Self {
            gateway,
            store: RecordStore::new(),
            saved: SavedDateIndex::new(),
            roster: Vec::new(),
            classes: ClassRegistry::default(),
            holidays: HolidayCalendar::default(),
            academic_year_start: None,
            clock,
            session_id: Uuid::new_v4(),
            last_loaded_at: None,
        }
    }

    pub fn set_roster(&mut self, students: Vec<Student>, class_order: Vec<String>) {
        self.roster = students;
        self.classes = ClassRegistry::new(class_order);
    }

    pub fn set_holidays(&mut self, holidays: Vec<Holiday>) {
        self.holidays = HolidayCalendar::new(holidays);
    }

    pub fn set_academic_year_start(&mut self, start: Option<NaiveDate>) {
        self.academic_year_start = start;
    }

    pub fn roster(&self) -> &[Student] {
        &self.roster
    }

    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    pub fn eligible_on(&self, date: NaiveDate) -> Vec<&Student> {
        eligible_on(date, &self.roster, &self.classes)
    }

    pub fn holidays(&self) -> &[Holiday] {
        self.holidays.holidays()
    }

    pub fn academic_year_start(&self) -> Option<NaiveDate> {
        self.academic_year_start
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn saved_index(&self) -> &SavedDateIndex {
        &self.saved
    }

    /// Replaces the in-memory store with the backend document.
    pub fn load(&mut self) -> Result<LoadSummary, AttendanceError> {
        let mut snapshot = self
            .gateway
            .load_all()
            .map_err(|e| AttendanceError::PersistenceFailure(format!("{e:#}")))?;
        let stripped = strip_neutral_snapshot(&mut snapshot);
        if stripped > 0 {
            warn!(stripped, "dropped neutral entries from loaded attendance");
        }
        self.saved = SavedDateIndex::from_snapshot(&snapshot);
        self.store.replace_all(snapshot);
        self.last_loaded_at = Some(Local::now());
        info!(
            session = %self.session_id,
            dates = self.saved.len(),
            "attendance loaded"
        );
        Ok(LoadSummary {
            dates: self.store.snapshot().len(),
            saved_dates: self.saved.len(),
            stripped_neutral: stripped,
        })
    }

    /// Register rows for `date`. A non-holiday date with no entries is
    /// seeded from recent history and the seed becomes the unsaved draft.
    pub fn open_day(&mut self, date: NaiveDate) -> Result<DayView, AttendanceError> {
        let today = self.clock.today();
        EditValidator {
            holidays: &self.holidays,
            today,
            academic_year_start: self.academic_year_start,
        }
        .check_navigable(date)?;

        let holiday = self.holidays.name_of(date).map(|s| s.to_string());
        let mut seeded = None;
        if holiday.is_none() && !self.store.has_records(date) {
            let eligible = eligible_on(date, &self.roster, &self.classes);
            let outcome = seed(date, &eligible, &self.store, &self.holidays);
            debug!(
                %date,
                copied = outcome.copied,
                defaulted = outcome.defaulted,
                sources = outcome.source_dates.len(),
                "seeded attendance draft"
            );
            self.store.set_day(date, outcome.records);
            seeded = Some(SeedInfo {
                source_dates: outcome.source_dates,
                copied: outcome.copied,
                defaulted: outcome.defaulted,
            });
        }

        let rows = rows_for(date, &self.roster, &self.classes, &self.store);
        Ok(DayView {
            date,
            holiday,
            saved: self.saved.is_saved(date),
            seeded,
            summary: summarize(&rows),
            rows,
        })
    }

    pub fn toggle(&mut self, date: NaiveDate, student_id: &str) -> Result<Mark, AttendanceError> {
        let validator = EditValidator {
            holidays: &self.holidays,
            today: self.clock.today(),
            academic_year_start: self.academic_year_start,
        };
        validator.check_editable(date)?;
        let student = find_eligible(&self.roster, date, student_id)?;
        validator.toggle(&mut self.store, date, student)
    }

    pub fn set_reason(
        &mut self,
        date: NaiveDate,
        student_id: &str,
        text: &str,
    ) -> Result<(), AttendanceError> {
        let validator = EditValidator {
            holidays: &self.holidays,
            today: self.clock.today(),
            academic_year_start: self.academic_year_start,
        };
        validator.check_editable(date)?;
        let student = find_eligible(&self.roster, date, student_id)?;
        validator.set_reason(&mut self.store, date, student, text)
    }

    /// Bulk-marks every eligible student. Absent keeps existing reasons.
    pub fn mark_all(&mut self, date: NaiveDate, mark: Mark) -> Result<usize, AttendanceError> {
        EditValidator {
            holidays: &self.holidays,
            today: self.clock.today(),
            academic_year_start: self.academic_year_start,
        }
        .check_editable(date)?;
        let ids: Vec<String> = eligible_on(date, &self.roster, &self.classes)
            .into_iter()
            .map(|s| s.id.clone())
            .collect();
        if ids.is_empty() {
            return Err(AttendanceError::EmptyRosterOnDate { date });
        }
        for id in &ids {
            self.store.set_status(date, id, mark);
        }
        Ok(ids.len())
    }

    /// Validates `date`, replaces the whole backend document with the
    /// current draft store, then removes auto-applied future dates. Every
    /// non-empty date in the persisted document counts as saved afterwards.
    /// A failed save leaves the draft exactly as it was.
    pub fn save(&mut self, date: NaiveDate) -> Result<SaveOutcome, AttendanceError> {
        let payload = EditValidator {
            holidays: &self.holidays,
            today: self.clock.today(),
            academic_year_start: self.academic_year_start,
        }
        .validate_for_save(&self.store, date, &self.roster)
        .map_err(|e| {
            warn!(%date, error = %e, "attendance save rejected");
            e
        })?;

        let entries = payload.len();
        let mut candidate = self.store.snapshot().clone();
        if payload.is_empty() {
            candidate.remove(&date);
        } else {
            candidate.insert(date, payload);
        }
        assert_no_neutral_entries(&candidate)?;
        self.gateway.save_all(Some(&candidate)).map_err(|e| {
            warn!(%date, error = %format!("{e:#}"), "attendance save failed");
            AttendanceError::PersistenceFailure(format!("{e:#}"))
        })?;

        // Seeded drafts for other dates went out with the document too, so
        // the index follows what the backend now holds.
        self.saved = SavedDateIndex::from_snapshot(&candidate);
        self.store.replace_all(candidate);
        info!(session = %self.session_id, %date, entries, "attendance saved");

        let (cleaned_up, cleanup_error) = match self.cleanup() {
            Ok(removed) => (removed, None),
            Err(e) => {
                warn!(error = %e, "auto-applied cleanup failed after save");
                (Vec::new(), Some(e.to_string()))
            }
        };
        Ok(SaveOutcome {
            date,
            entries,
            cleaned_up,
            cleanup_error,
        })
    }

    /// Drops saved future dates identical to today and persists the
    /// reduced store. Nothing changes locally unless the persist succeeds.
    pub fn cleanup(&mut self) -> Result<Vec<NaiveDate>, AttendanceError> {
        let today = self.clock.today();
        let mut store = self.store.clone();
        let mut saved = self.saved.clone();
        let removed = cleanup_auto_applied(today, &mut store, &mut saved);
        if removed.is_empty() {
            return Ok(removed);
        }
        assert_no_neutral_entries(store.snapshot())?;
        self.gateway
            .save_all(Some(store.snapshot()))
            .map_err(|e| AttendanceError::PersistenceFailure(format!("{e:#}")))?;
        self.store = store;
        self.saved = saved;
        info!(removed = removed.len(), %today, "removed auto-applied attendance dates");
        Ok(removed)
    }

    /// Sends the reset sentinel and wipes local state once it succeeds.
    pub fn reset(&mut self) -> Result<(), AttendanceError> {
        self.gateway
            .save_all(None)
            .map_err(|e| AttendanceError::PersistenceFailure(format!("{e:#}")))?;
        self.store.clear();
        self.saved.clear();
        info!(session = %self.session_id, "attendance reset");
        Ok(())
    }

    /// The backend document as it stands, without touching the drafts.
    pub fn persisted(&mut self) -> Result<Snapshot, AttendanceError> {
        let mut snapshot = self
            .gateway
            .load_all()
            .map_err(|e| AttendanceError::PersistenceFailure(format!("{e:#}")))?;
        strip_neutral_snapshot(&mut snapshot);
        Ok(snapshot)
    }

    /// Replaces the backend document with `snapshot` and then the local
    /// state with it. An empty snapshot goes out as the reset sentinel.
    /// Drafts survive a failed persist.
    pub fn restore(&mut self, snapshot: Snapshot) -> Result<LoadSummary, AttendanceError> {
        assert_no_neutral_entries(&snapshot)?;
        let document = if snapshot.values().all(|day| day.is_empty()) {
            None
        } else {
            Some(&snapshot)
        };
        self.gateway
            .save_all(document)
            .map_err(|e| AttendanceError::PersistenceFailure(format!("{e:#}")))?;

        self.saved = SavedDateIndex::from_snapshot(&snapshot);
        self.store.replace_all(snapshot);
        self.last_loaded_at = Some(Local::now());
        info!(session = %self.session_id, dates = self.saved.len(), "attendance restored");
        Ok(LoadSummary {
            dates: self.store.snapshot().len(),
            saved_dates: self.saved.len(),
            stripped_neutral: 0,
        })
    }

    pub fn month_view(&self, year: i32, month: u32) -> Option<MonthView> {
        let classifier = CalendarClassifier {
            saved: &self.saved,
            academic_year_start: self.academic_year_start,
            today: self.clock.today(),
        };
        month_view(year, month, &classifier, &self.store)
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            session_id: self.session_id.to_string(),
            today: self.clock.today(),
            last_loaded_at: self.last_loaded_at.map(|t| t.to_rfc3339()),
            academic_year_start: self.academic_year_start,
            saved_dates: self.saved.iter().collect(),
            draft_dates: self
                .store
                .dates()
                .filter(|d| !self.saved.is_saved(*d))
                .collect(),
        }
    }
}

fn find_eligible<'a>(
    roster: &'a [Student],
    date: NaiveDate,
    student_id: &str,
) -> Result<&'a Student, AttendanceError> {
    roster
        .iter()
        .find(|s| s.id == student_id && is_eligible_on(s, date))
        .ok_or_else(|| AttendanceError::NotEligible {
            date,
            student_id: student_id.to_string(),
        })
}
