use crate::db;
use crate::error::PersistenceError;
use crate::ipc::error::err;
use crate::ipc::types::AppState;
use crate::sync::LookupOutcome;
use rusqlite::Connection;
use serde_json::json;

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn bad_params(message: impl Into<String>) -> Self {
        HandlerErr {
            code: "bad_params",
            message: message.into(),
            details: None,
        }
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<PersistenceError> for HandlerErr {
    fn from(e: PersistenceError) -> Self {
        HandlerErr {
            code: "persistence",
            message: e.to_string(),
            details: None,
        }
    }
}

pub fn get_required_str<'a>(
    params: &'a serde_json::Value,
    key: &str,
) -> Result<&'a str, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

/// Opens a connection for one lookup or save. It is dropped with the caller's
/// scope.
pub fn open_store(state: &AppState) -> Result<Connection, HandlerErr> {
    let Some(workspace) = state.workspace.as_ref() else {
        return Err(HandlerErr {
            code: "no_workspace",
            message: "select a workspace first".to_string(),
            details: None,
        });
    };
    db::open_db(workspace).map_err(|e| PersistenceError::from(e).into())
}

pub fn sheet_json(state: &AppState) -> serde_json::Value {
    let form = &state.form;
    let roster: Vec<serde_json::Value> = form
        .roster()
        .rows()
        .iter()
        .enumerate()
        .map(|(i, row)| {
            json!({
                "no": i + 1,
                "name": row.name,
                "regNo": row.reg_no,
            })
        })
        .collect();
    json!({
        "sheetId": state.loaded.id,
        "program": form.program().map(|p| p.as_str()),
        "faculty": form.faculty(),
        "department": form.department(),
        "courseUnit": form.course_unit(),
        "lecturer": form.lecturer(),
        "date": form.date().map(|d| d.format("%Y-%m-%d").to_string()),
        "time": form.time(),
        "coordinatorName": form.details().coordinator_name,
        "coordinatorPhone": form.details().coordinator_phone,
        "comments": form.details().comments,
        "complete": form.is_complete(),
        "rosterRows": form.roster().row_count(),
        "roster": roster,
    })
}

pub fn lookup_json(outcome: Option<LookupOutcome>) -> serde_json::Value {
    match outcome {
        None => serde_json::Value::Null,
        Some(LookupOutcome::Skipped) => json!({ "kind": "skipped" }),
        Some(LookupOutcome::Loaded(id)) => json!({ "kind": "loaded", "sheetId": id }),
        Some(LookupOutcome::Cleared) => json!({ "kind": "cleared" }),
        Some(LookupOutcome::Unchanged) => json!({ "kind": "unchanged" }),
    }
}
