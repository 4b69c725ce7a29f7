use crate::attendance::holidays::{validate_holidays, HolidayProblem};
use crate::attendance::Holiday;
use crate::db;
use crate::ipc::error::err;
use crate::ipc::helpers::{respond, to_json, HandlerErr};
use crate::ipc::types::{AppState, Request, Session};
use rusqlite::Connection;
use serde_json::json;

fn holidays_set(
    conn: &Connection,
    session: &mut Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let raw = params
        .get("holidays")
        .ok_or_else(|| HandlerErr::bad_params("missing holidays"))?;
    let holidays: Vec<Holiday> = serde_json::from_value(raw.clone())
        .map_err(|e| HandlerErr::bad_params(format!("invalid holidays: {}", e)))?;

    validate_holidays(&holidays).map_err(|problem| {
        let (code, details) = match &problem {
            HolidayProblem::Overlap { first, second } => (
                "holiday_overlap",
                json!({ "first": first, "second": second }),
            ),
            HolidayProblem::EmptyName { index } | HolidayProblem::InvertedRange { index } => {
                ("bad_params", json!({ "index": index }))
            }
        };
        HandlerErr {
            code,
            message: problem.to_string(),
            details: Some(details),
        }
    })?;

    db::replace_holidays(conn, &holidays).map_err(|e| HandlerErr::db("db_update_failed", e))?;
    let count = holidays.len();
    session.set_holidays(holidays);
    Ok(json!({ "count": count }))
}

fn handle_holidays_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (Some(conn), Some(session)) = (state.db.as_ref(), state.session.as_mut()) else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    respond(&req.id, holidays_set(conn, session, &req.params))
}

fn handle_holidays_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(session) = state.session.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    respond(
        &req.id,
        to_json(&session.holidays()).map(|h| json!({ "holidays": h })),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "holidays.set" => Some(handle_holidays_set(state, req)),
        "holidays.list" => Some(handle_holidays_list(state, req)),
        _ => None,
    }
}
