use std::path::PathBuf;

use crate::attendance::{AttendanceSession, Clock};
use crate::db::SqliteGateway;
use rusqlite::Connection;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub type Session = AttendanceSession<SqliteGateway>;

pub struct AppState {
    pub clock: Clock,
    pub workspace: Option<PathBuf>,
    /// Roster, holiday and settings tables.
    pub db: Option<Connection>,
    pub session: Option<Session>,
}

impl AppState {
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            workspace: None,
            db: None,
            session: None,
        }
    }
}
