use crate::attendance::dates::parse_month_key;
use crate::ipc::error::err;
use crate::ipc::helpers::{get_required_str, respond, to_json, HandlerErr};
use crate::ipc::types::{AppState, Request, Session};

fn calendar_month(
    session: &Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let raw = get_required_str(params, "month")?;
    let (year, month) =
        parse_month_key(&raw).ok_or_else(|| HandlerErr::bad_params("month must be YYYY-MM"))?;
    let view = session
        .month_view(year, month)
        .ok_or_else(|| HandlerErr::bad_params(format!("month out of range: {}", raw)))?;
    to_json(&view)
}

fn handle_calendar_month(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(session) = state.session.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    respond(&req.id, calendar_month(session, &req.params))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "calendar.month" => Some(handle_calendar_month(state, req)),
        _ => None,
    }
}
