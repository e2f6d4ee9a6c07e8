use crate::access::{AccessError, Role};
use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use chrono::NaiveDate;
use rusqlite::Connection;

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        Self::new("bad_params", message)
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        if self.code != "bad_params" {
            tracing::debug!(request_id = id, code = self.code, message = %self.message, "request failed");
        }
        err(id, self.code, self.message, self.details)
    }
}

impl From<AccessError> for HandlerErr {
    fn from(e: AccessError) -> Self {
        HandlerErr::new(e.code(), e.to_string())
    }
}

pub fn query_failed(e: rusqlite::Error) -> HandlerErr {
    tracing::warn!(error = %e, "database query failed");
    HandlerErr::new("db_query_failed", e.to_string())
}

pub fn insert_failed(table: &str, e: rusqlite::Error) -> HandlerErr {
    tracing::warn!(table, error = %e, "database insert failed");
    HandlerErr::new("db_insert_failed", e.to_string())
        .with_details(serde_json::json!({ "table": table }))
}

pub fn db_conn(state: &AppState) -> Result<&Connection, HandlerErr> {
    state
        .db
        .as_ref()
        .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))
}

pub fn required_i64(params: &serde_json::Value, key: &str) -> Result<i64, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn optional_i64(params: &serde_json::Value, key: &str) -> Result<Option<i64>, HandlerErr> {
    match params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| HandlerErr::bad_params(format!("{} must be an integer or null", key))),
    }
}

pub fn required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    let s = params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))?;
    if s.is_empty() {
        return Err(HandlerErr::bad_params(format!("{} must not be empty", key)));
    }
    Ok(s)
}

pub fn optional_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

pub fn parse_date(raw: &str, key: &str) -> Result<NaiveDate, HandlerErr> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| HandlerErr::bad_params(format!("{} must be YYYY-MM-DD", key)))
}

pub fn required_date(params: &serde_json::Value, key: &str) -> Result<NaiveDate, HandlerErr> {
    let raw = params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))?;
    parse_date(raw, key)
}

pub fn optional_date(params: &serde_json::Value, key: &str) -> Result<Option<NaiveDate>, HandlerErr> {
    match params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => match v.as_str() {
            Some(s) => parse_date(s, key).map(Some),
            None => Err(HandlerErr::bad_params(format!("{} must be YYYY-MM-DD", key))),
        },
    }
}

/// `params.caller` resolved by the identity layer in front of this process.
pub fn caller_role(req: &Request) -> Result<Role, HandlerErr> {
    let caller = req
        .params
        .get("caller")
        .ok_or_else(|| HandlerErr::bad_params("missing caller"))?;
    Role::from_json(caller).map_err(HandlerErr::bad_params)
}

pub fn respond(req: &Request, res: Result<serde_json::Value, HandlerErr>) -> serde_json::Value {
    match res {
        Ok(v) => crate::ipc::error::ok(&req.id, v),
        Err(e) => e.response(&req.id),
    }
}

/// Runs a storage-backed handler, answering `no_workspace` when nothing is open.
pub fn with_conn(
    state: &AppState,
    req: &Request,
    f: fn(&Connection, &Request) -> Result<serde_json::Value, HandlerErr>,
) -> serde_json::Value {
    let res = db_conn(state).and_then(|conn| f(conn, req));
    respond(req, res)
}
