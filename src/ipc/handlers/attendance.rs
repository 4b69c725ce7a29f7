use crate::attendance::Mark;
use crate::ipc::error::err;
use crate::ipc::helpers::{get_required_date, get_required_str, respond, to_json, HandlerErr};
use crate::ipc::types::{AppState, Request, Session};
use serde_json::json;

fn attendance_load(session: &mut Session) -> Result<serde_json::Value, HandlerErr> {
    let summary = session.load()?;
    to_json(&summary)
}

fn attendance_open_day(
    session: &mut Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let date = get_required_date(params, "date")?;
    let view = session.open_day(date)?;
    to_json(&view)
}

fn attendance_toggle(
    session: &mut Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let date = get_required_date(params, "date")?;
    let student_id = get_required_str(params, "studentId")?;
    let status = session.toggle(date, &student_id)?;
    Ok(json!({ "studentId": student_id, "status": status.as_str() }))
}

fn attendance_set_reason(
    session: &mut Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let date = get_required_date(params, "date")?;
    let student_id = get_required_str(params, "studentId")?;
    let reason = get_required_str(params, "reason")?;
    session.set_reason(date, &student_id, &reason)?;
    Ok(json!({ "ok": true }))
}

fn attendance_mark_all(
    session: &mut Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let date = get_required_date(params, "date")?;
    let raw = get_required_str(params, "status")?;
    let mark = Mark::parse(&raw)
        .ok_or_else(|| HandlerErr::bad_params("status must be neutral, present or absent"))?;
    let updated = session.mark_all(date, mark)?;
    Ok(json!({ "updated": updated, "status": mark.as_str() }))
}

fn attendance_save(
    session: &mut Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let date = get_required_date(params, "date")?;
    let outcome = session.save(date)?;
    to_json(&outcome)
}

fn attendance_cleanup(session: &mut Session) -> Result<serde_json::Value, HandlerErr> {
    let removed = session.cleanup()?;
    Ok(json!({ "removed": removed }))
}

fn attendance_reset(session: &mut Session) -> Result<serde_json::Value, HandlerErr> {
    session.reset()?;
    Ok(json!({ "ok": true }))
}

fn handle(
    state: &mut AppState,
    req: &Request,
    f: impl FnOnce(&mut Session, &serde_json::Value) -> Result<serde_json::Value, HandlerErr>,
) -> serde_json::Value {
    let Some(session) = state.session.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    respond(&req.id, f(session, &req.params))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let resp = match req.method.as_str() {
        "attendance.load" => handle(state, req, |s, _| attendance_load(s)),
        "attendance.openDay" => handle(state, req, attendance_open_day),
        "attendance.toggle" => handle(state, req, attendance_toggle),
        "attendance.setReason" => handle(state, req, attendance_set_reason),
        "attendance.markAll" => handle(state, req, attendance_mark_all),
        "attendance.save" => handle(state, req, attendance_save),
        "attendance.cleanup" => handle(state, req, |s, _| attendance_cleanup(s)),
        "attendance.reset" => handle(state, req, |s, _| attendance_reset(s)),
        "attendance.status" => handle(state, req, |s, _| to_json(&s.status())),
        _ => return None,
    };
    Some(resp)
}
