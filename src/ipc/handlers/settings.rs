use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{get_optional_date, respond, HandlerErr};
use crate::ipc::types::{AppState, Request, Session};
use rusqlite::Connection;
use serde_json::json;

fn settings_set_academic_year_start(
    conn: &Connection,
    session: &mut Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let start = get_optional_date(params, "date")?;
    db::set_academic_year_start(conn, start).map_err(|e| HandlerErr::db("db_update_failed", e))?;
    session.set_academic_year_start(start);
    Ok(json!({ "academicYearStart": start }))
}

fn handle_settings_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(session) = state.session.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    ok(
        &req.id,
        json!({ "academicYearStart": session.academic_year_start() }),
    )
}

fn handle_settings_set_academic_year_start(
    state: &mut AppState,
    req: &Request,
) -> serde_json::Value {
    let (Some(conn), Some(session)) = (state.db.as_ref(), state.session.as_mut()) else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    respond(
        &req.id,
        settings_set_academic_year_start(conn, session, &req.params),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "settings.get" => Some(handle_settings_get(state, req)),
        "settings.setAcademicYearStart" => {
            Some(handle_settings_set_academic_year_start(state, req))
        }
        _ => None,
    }
}
