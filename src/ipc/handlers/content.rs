use crate::access;
use crate::config::Config;
use crate::ipc::helpers::{caller_role, db_conn, optional_date, query_failed, respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::rotation;
use crate::store::{self, ContentKind};
use chrono::Utc;
use rusqlite::Connection;
use serde_json::json;

/// Today's pick. `params.date` pins the reference day, otherwise "today" in the configured zone.
fn current_pick(
    conn: &Connection,
    config: &Config,
    req: &Request,
    kind: ContentKind,
) -> Result<serde_json::Value, HandlerErr> {
    // Any resolved role may read; the caller still has to be one.
    caller_role(req)?;
    let date = match optional_date(&req.params, "date")? {
        Some(d) => d,
        None => rotation::local_date(Utc::now(), config.timezone),
    };
    let cadence = kind.cadence();
    let items = store::list_content(conn, kind).map_err(query_failed)?;
    let picked = rotation::select_for_date(cadence, date, items.iter().map(|i| i.id))
        .and_then(|id| items.iter().find(|i| i.id == id));
    Ok(json!({
        "item": picked,
        "seed": rotation::seed_for(cadence, date),
    }))
}

fn list_items(conn: &Connection, req: &Request, kind: ContentKind) -> Result<serde_json::Value, HandlerErr> {
    access::require_admin(caller_role(req)?)?;
    let items = store::list_content(conn, kind).map_err(query_failed)?;
    Ok(json!({ "items": items }))
}

fn replace_items(
    conn: &Connection,
    req: &Request,
    kind: ContentKind,
) -> Result<serde_json::Value, HandlerErr> {
    access::require_admin(caller_role(req)?)?;
    let Some(raw) = req.params.get("items").and_then(|v| v.as_array()) else {
        return Err(HandlerErr::bad_params("missing items"));
    };
    let mut texts = Vec::with_capacity(raw.len());
    for v in raw {
        match v {
            serde_json::Value::String(s) => texts.push(s.clone()),
            serde_json::Value::Null => texts.push(String::new()),
            _ => return Err(HandlerErr::bad_params("items must contain only strings")),
        }
    }
    let items = store::replace_content(conn, kind, &texts).map_err(|e| {
        tracing::warn!(error = %e, ?kind, "content replace failed");
        HandlerErr::new("db_update_failed", e.to_string())
    })?;
    tracing::info!(?kind, count = items.len(), "content list replaced");
    Ok(json!({ "items": items }))
}

enum Action {
    Pick,
    List,
    Replace,
}

fn route(method: &str) -> Option<(ContentKind, Action)> {
    let out = match method {
        "content.weeklyIntention" => (ContentKind::WeeklyIntention, Action::Pick),
        "content.dailyQuestion" => (ContentKind::DailyQuestion, Action::Pick),
        "content.weeklyIntentions.list" => (ContentKind::WeeklyIntention, Action::List),
        "content.weeklyIntentions.replace" => (ContentKind::WeeklyIntention, Action::Replace),
        "content.dailyQuestions.list" => (ContentKind::DailyQuestion, Action::List),
        "content.dailyQuestions.replace" => (ContentKind::DailyQuestion, Action::Replace),
        _ => return None,
    };
    Some(out)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let (kind, action) = route(req.method.as_str())?;
    let res = db_conn(state).and_then(|conn| match action {
        Action::Pick => current_pick(conn, &state.config, req, kind),
        Action::List => list_items(conn, req, kind),
        Action::Replace => replace_items(conn, req, kind),
    });
    Some(respond(req, res))
}
