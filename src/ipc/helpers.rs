use crate::attendance::dates::parse_date;
use crate::attendance::AttendanceError;
use crate::ipc::error::{err, ok};
use chrono::NaiveDate;
use serde::Serialize;

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        Self {
            code: "bad_params",
            message: message.into(),
            details: None,
        }
    }

    pub fn db(code: &'static str, e: anyhow::Error) -> Self {
        Self {
            code,
            message: format!("{e:#}"),
            details: None,
        }
    }
}

impl From<AttendanceError> for HandlerErr {
    fn from(e: AttendanceError) -> Self {
        Self {
            code: e.code(),
            details: e.details(),
            message: e.to_string(),
        }
    }
}

pub fn respond(id: &str, result: Result<serde_json::Value, HandlerErr>) -> serde_json::Value {
    match result {
        Ok(v) => ok(id, v),
        Err(error) => error.response(id),
    }
}

pub fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value, HandlerErr> {
    serde_json::to_value(value).map_err(|e| HandlerErr {
        code: "encode_failed",
        message: e.to_string(),
        details: None,
    })
}

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn get_required_date(params: &serde_json::Value, key: &str) -> Result<NaiveDate, HandlerErr> {
    let raw = get_required_str(params, key)?;
    parse_date(&raw).ok_or_else(|| HandlerErr::bad_params(format!("{} must be YYYY-MM-DD", key)))
}

/// `null`/missing -> None; a string must be a valid date.
pub fn get_optional_date(
    params: &serde_json::Value,
    key: &str,
) -> Result<Option<NaiveDate>, HandlerErr> {
    match params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => {
            let raw = v
                .as_str()
                .ok_or_else(|| HandlerErr::bad_params(format!("{} must be string or null", key)))?;
            parse_date(raw)
                .map(Some)
                .ok_or_else(|| HandlerErr::bad_params(format!("{} must be YYYY-MM-DD", key)))
        }
    }
}
