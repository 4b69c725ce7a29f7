use crate::attendance::dates::{format_date, parse_date};
use crate::attendance::{Holiday, PersistenceGateway, Snapshot, Student, StudentStatus};
use anyhow::{anyhow, Context};
use chrono::{Local, NaiveDate};
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DB_FILE_NAME: &str = "attendance.sqlite3";
const ACADEMIC_YEAR_START_KEY: &str = "academic_year.start_date";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassEntry {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS classes(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            position INTEGER NOT NULL
        )",
        [],
    )?;

    // No foreign key on class_id: students of an
    // unregistered class still appear, sorted last.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            class_id TEXT NOT NULL,
            name TEXT NOT NULL,
            roll_number TEXT NOT NULL,
            status TEXT NOT NULL,
            inactivation_date TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_class ON students(class_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS holidays(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            name TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    // Single-row document store. NULL document = reset.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS attendance_store(
            id INTEGER PRIMARY KEY CHECK (id = 1),
            document TEXT,
            saved_at TEXT
        )",
        [],
    )?;

    Ok(conn)
}

pub fn settings_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    match raw {
        Some(text) => Ok(Some(
            serde_json::from_str(&text).with_context(|| format!("setting {} is invalid JSON", key))?,
        )),
        None => Ok(None),
    }
}

pub fn settings_set_json(
    conn: &Connection,
    key: &str,
    value: &serde_json::Value,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, value.to_string()),
    )?;
    Ok(())
}

pub fn academic_year_start(conn: &Connection) -> anyhow::Result<Option<NaiveDate>> {
    let Some(value) = settings_get_json(conn, ACADEMIC_YEAR_START_KEY)? else {
        return Ok(None);
    };
    match value.as_str() {
        Some(raw) => parse_date(raw)
            .map(Some)
            .ok_or_else(|| anyhow!("stored academic year start is not a date: {}", raw)),
        None => Ok(None),
    }
}

pub fn set_academic_year_start(conn: &Connection, start: Option<NaiveDate>) -> anyhow::Result<()> {
    let value = match start {
        Some(d) => serde_json::Value::String(format_date(d)),
        None => serde_json::Value::Null,
    };
    settings_set_json(conn, ACADEMIC_YEAR_START_KEY, &value)
}

pub fn load_classes(conn: &Connection) -> anyhow::Result<Vec<ClassEntry>> {
    let mut stmt = conn.prepare("SELECT id, name FROM classes ORDER BY position, id")?;
    let rows = stmt
        .query_map([], |r| {
            Ok(ClassEntry {
                id: r.get(0)?,
                name: r.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn load_students(conn: &Connection) -> anyhow::Result<Vec<Student>> {
    let mut stmt = conn.prepare(
        "SELECT id, class_id, name, roll_number, status, inactivation_date
         FROM students
         ORDER BY rowid",
    )?;
    let raw = stmt
        .query_map([], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, String>(4)?,
                r.get::<_, Option<String>>(5)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut students = Vec::with_capacity(raw.len());
    for (id, class, name, roll_number, status, inactivation) in raw {
        let status = match status.as_str() {
            "active" => StudentStatus::Active,
            "inactive" => StudentStatus::Inactive,
            other => return Err(anyhow!("student {} has unknown status {}", id, other)),
        };
        let inactivation_date = match inactivation {
            Some(raw) => Some(
                parse_date(&raw)
                    .ok_or_else(|| anyhow!("student {} has bad inactivation date {}", id, raw))?,
            ),
            None => None,
        };
        students.push(Student {
            id,
            name,
            roll_number,
            class,
            status,
            inactivation_date,
        });
    }
    Ok(students)
}

/// Replaces the whole roster (classes in registration order + students).
pub fn replace_roster(
    conn: &Connection,
    classes: &[ClassEntry],
    students: &[Student],
) -> anyhow::Result<()> {
    let tx = conn.unchecked_transaction()?;
    write_roster(&tx, classes, students)?;
    tx.commit()?;
    Ok(())
}

fn write_roster(conn: &Connection, classes: &[ClassEntry], students: &[Student]) -> anyhow::Result<()> {
    conn.execute("DELETE FROM students", [])?;
    conn.execute("DELETE FROM classes", [])?;
    for (i, c) in classes.iter().enumerate() {
        conn.execute(
            "INSERT INTO classes(id, name, position) VALUES(?, ?, ?)",
            (&c.id, &c.name, i as i64),
        )
        .with_context(|| format!("duplicate class {}", c.id))?;
    }
    for s in students {
        let status = match s.status {
            StudentStatus::Active => "active",
            StudentStatus::Inactive => "inactive",
        };
        conn.execute(
            "INSERT INTO students(id, class_id, name, roll_number, status, inactivation_date)
             VALUES(?, ?, ?, ?, ?, ?)",
            (
                &s.id,
                &s.class,
                &s.name,
                &s.roll_number,
                status,
                s.inactivation_date.map(format_date),
            ),
        )
        .with_context(|| format!("duplicate student {}", s.id))?;
    }
    Ok(())
}

pub fn load_holidays(conn: &Connection) -> anyhow::Result<Vec<Holiday>> {
    let mut stmt = conn.prepare("SELECT start_date, end_date, name FROM holidays ORDER BY id")?;
    let raw = stmt
        .query_map([], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    raw.into_iter()
        .map(|(start, end, name)| {
            Ok(Holiday {
                start_date: parse_date(&start)
                    .ok_or_else(|| anyhow!("holiday {} has bad start date {}", name, start))?,
                end_date: parse_date(&end)
                    .ok_or_else(|| anyhow!("holiday {} has bad end date {}", name, end))?,
                name,
            })
        })
        .collect()
}

pub fn replace_holidays(conn: &Connection, holidays: &[Holiday]) -> anyhow::Result<()> {
    let tx = conn.unchecked_transaction()?;
    write_holidays(&tx, holidays)?;
    tx.commit()?;
    Ok(())
}

fn write_holidays(conn: &Connection, holidays: &[Holiday]) -> anyhow::Result<()> {
    conn.execute("DELETE FROM holidays", [])?;
    for h in holidays {
        conn.execute(
            "INSERT INTO holidays(start_date, end_date, name) VALUES(?, ?, ?)",
            (format_date(h.start_date), format_date(h.end_date), &h.name),
        )?;
    }
    Ok(())
}

/// Replaces roster, holidays and the academic year start together; a
/// failure rolls all three back.
pub fn restore_workspace_tables(
    conn: &Connection,
    classes: &[ClassEntry],
    students: &[Student],
    holidays: &[Holiday],
    academic_year_start: Option<NaiveDate>,
) -> anyhow::Result<()> {
    let tx = conn.unchecked_transaction()?;
    write_roster(&tx, classes, students)?;
    write_holidays(&tx, holidays)?;
    set_academic_year_start(&tx, academic_year_start)?;
    tx.commit()?;
    Ok(())
}

/// Full-replace attendance backend over the workspace database.
pub struct SqliteGateway {
    conn: Connection,
}

impl SqliteGateway {
    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        Ok(Self {
            conn: open_db(workspace)?,
        })
    }
}

impl PersistenceGateway for SqliteGateway {
    fn load_all(&mut self) -> anyhow::Result<Snapshot> {
        let doc: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT document FROM attendance_store WHERE id = 1",
                [],
                |r| r.get(0),
            )
            .optional()
            .context("failed to read attendance document")?;
        match doc.flatten() {
            Some(text) => {
                serde_json::from_str(&text).context("attendance document is invalid JSON")
            }
            None => Ok(Snapshot::new()),
        }
    }

    fn save_all(&mut self, snapshot: Option<&Snapshot>) -> anyhow::Result<()> {
        let document = match snapshot {
            Some(s) => Some(serde_json::to_string(s).context("failed to encode attendance")?),
            None => None,
        };
        self.conn
            .execute(
                "INSERT INTO attendance_store(id, document, saved_at) VALUES(1, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET
                   document = excluded.document,
                   saved_at = excluded.saved_at",
                (document, Local::now().to_rfc3339()),
            )
            .context("failed to write attendance document")?;
        Ok(())
    }
}
