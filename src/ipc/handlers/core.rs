use crate::attendance::dates::format_date;
use crate::attendance::AttendanceSession;
use crate::db::{self, SqliteGateway};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use anyhow::Context;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::info;

/// Opens (or creates) a workspace and builds a fresh session from the
/// roster, holiday and settings tables plus the stored attendance document.
pub fn open_workspace(state: &mut AppState, path: &Path) -> anyhow::Result<()> {
    state.session = None;
    state.db = None;

    let conn = db::open_db(path)?;
    let classes = db::load_classes(&conn).context("failed to load classes")?;
    let students = db::load_students(&conn).context("failed to load students")?;
    let holidays = db::load_holidays(&conn).context("failed to load holidays")?;
    let start = db::academic_year_start(&conn).context("failed to load settings")?;

    let mut session = AttendanceSession::new(SqliteGateway::open(path)?, state.clock);
    session.set_roster(students, classes.into_iter().map(|c| c.id).collect());
    session.set_holidays(holidays);
    session.set_academic_year_start(start);
    session.load()?;

    info!(workspace = %path.display(), "workspace opened");
    state.workspace = Some(path.to_path_buf());
    state.db = Some(conn);
    state.session = Some(session);
    Ok(())
}

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "today": format_date(state.clock.today()),
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match open_workspace(state, &path) {
        Ok(()) => ok(&req.id, json!({ "workspacePath": path.to_string_lossy() })),
        Err(e) => err(&req.id, "db_open_failed", format!("{e:#}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
