use crate::attendance::roster::sort_for_register;
use crate::attendance::{Student, StudentStatus};
use crate::db::{self, ClassEntry};
use crate::ipc::error::err;
use crate::ipc::helpers::{get_optional_date, respond, to_json, HandlerErr};
use crate::ipc::types::{AppState, Request, Session};
use rusqlite::Connection;
use serde_json::json;
use std::collections::HashSet;

fn parse_array<T: serde::de::DeserializeOwned>(
    params: &serde_json::Value,
    key: &str,
) -> Result<Vec<T>, HandlerErr> {
    let Some(raw) = params.get(key) else {
        return Err(HandlerErr::bad_params(format!("missing {}", key)));
    };
    serde_json::from_value(raw.clone())
        .map_err(|e| HandlerErr::bad_params(format!("invalid {}: {}", key, e)))
}

fn check_roster(classes: &[ClassEntry], students: &[Student]) -> Result<(), HandlerErr> {
    let mut seen = HashSet::new();
    for c in classes {
        if c.id.trim().is_empty() || !seen.insert(c.id.as_str()) {
            return Err(HandlerErr {
                code: "bad_params",
                message: format!("class id {:?} is empty or duplicated", c.id),
                details: Some(json!({ "classId": c.id })),
            });
        }
    }
    let mut seen = HashSet::new();
    for s in students {
        if s.id.trim().is_empty() || !seen.insert(s.id.as_str()) {
            return Err(HandlerErr {
                code: "bad_params",
                message: format!("student id {:?} is empty or duplicated", s.id),
                details: Some(json!({ "studentId": s.id })),
            });
        }
        if s.status == StudentStatus::Active && s.inactivation_date.is_some() {
            return Err(HandlerErr {
                code: "bad_params",
                message: format!("active student {} cannot have an inactivation date", s.id),
                details: Some(json!({ "studentId": s.id })),
            });
        }
    }
    Ok(())
}

fn roster_set(
    conn: &Connection,
    session: &mut Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let classes: Vec<ClassEntry> = parse_array(params, "classes")?;
    let students: Vec<Student> = parse_array(params, "students")?;
    check_roster(&classes, &students)?;

    db::replace_roster(conn, &classes, &students)
        .map_err(|e| HandlerErr::db("db_update_failed", e))?;
    let counts = json!({ "classes": classes.len(), "students": students.len() });
    session.set_roster(students, classes.into_iter().map(|c| c.id).collect());
    Ok(counts)
}

fn roster_list(
    session: &Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let students: Vec<&Student> = match get_optional_date(params, "date")? {
        Some(date) => session.eligible_on(date),
        None => {
            let mut all: Vec<&Student> = session.roster().iter().collect();
            sort_for_register(&mut all, session.classes());
            all
        }
    };
    Ok(json!({ "students": to_json(&students)? }))
}

fn handle_roster_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (Some(conn), Some(session)) = (state.db.as_ref(), state.session.as_mut()) else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    respond(&req.id, roster_set(conn, session, &req.params))
}

fn handle_roster_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(session) = state.session.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    respond(&req.id, roster_list(session, &req.params))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "roster.set" => Some(handle_roster_set(state, req)),
        "roster.list" => Some(handle_roster_list(state, req)),
        _ => None,
    }
}
