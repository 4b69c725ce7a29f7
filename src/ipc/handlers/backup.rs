use crate::backup::{self, WorkspaceBundle};
use crate::db;
use crate::ipc::error::err;
use crate::ipc::helpers::{get_required_str, respond, to_json, HandlerErr};
use crate::ipc::types::{AppState, Request, Session};
use rusqlite::Connection;
use serde_json::json;
use std::path::PathBuf;
use tracing::{info, warn};

fn required_path(params: &serde_json::Value, key: &str) -> Result<PathBuf, HandlerErr> {
    let raw = get_required_str(params, key)?;
    if raw.trim().is_empty() {
        return Err(HandlerErr::bad_params(format!("{} must not be empty", key)));
    }
    Ok(PathBuf::from(raw))
}

fn backup_export(
    conn: &Connection,
    session: &mut Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let out_path = required_path(params, "outPath")?;
    let load = |e: anyhow::Error| HandlerErr::db("db_query_failed", e);
    let bundle = WorkspaceBundle {
        classes: db::load_classes(conn).map_err(load)?,
        students: db::load_students(conn).map_err(load)?,
        holidays: db::load_holidays(conn).map_err(load)?,
        academic_year_start: db::academic_year_start(conn).map_err(load)?,
        attendance: session.persisted()?,
    };

    let summary = backup::export_bundle(&bundle, &out_path).map_err(|e| HandlerErr {
        code: "io_failed",
        message: format!("{e:#}"),
        details: None,
    })?;
    info!(out = %out_path.display(), dates = summary.dates, "attendance bundle exported");
    let mut result = to_json(&summary)?;
    result["path"] = json!(out_path.to_string_lossy());
    Ok(result)
}

/// Nothing changes unless the bundle verifies. Tables are restored in one
/// transaction, then the attendance document through the gateway; the
/// drafts are only replaced once that persist succeeds.
fn backup_import(
    conn: &Connection,
    session: &mut Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let in_path = required_path(params, "inPath")?;
    let bundle = backup::read_bundle(&in_path).map_err(|e| {
        warn!(from = %in_path.display(), error = %format!("{e:#}"), "attendance bundle rejected");
        HandlerErr {
            code: "invalid_bundle",
            message: format!("{e:#}"),
            details: None,
        }
    })?;
    let summary = bundle.summary();

    db::restore_workspace_tables(
        conn,
        &bundle.classes,
        &bundle.students,
        &bundle.holidays,
        bundle.academic_year_start,
    )
    .map_err(|e| HandlerErr::db("db_update_failed", e))?;
    session.set_roster(
        bundle.students,
        bundle.classes.into_iter().map(|c| c.id).collect(),
    );
    session.set_holidays(bundle.holidays);
    session.set_academic_year_start(bundle.academic_year_start);

    session.restore(bundle.attendance)?;
    info!(from = %in_path.display(), dates = summary.dates, "attendance bundle imported");
    to_json(&summary)
}

fn handle_backup_export(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (Some(conn), Some(session)) = (state.db.as_ref(), state.session.as_mut()) else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    respond(&req.id, backup_export(conn, session, &req.params))
}

fn handle_backup_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (Some(conn), Some(session)) = (state.db.as_ref(), state.session.as_mut()) else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    respond(&req.id, backup_import(conn, session, &req.params))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.export" => Some(handle_backup_export(state, req)),
        "backup.import" => Some(handle_backup_import(state, req)),
        _ => None,
    }
}
