use crate::ipc::error::ok;
use crate::ipc::helpers::{sheet_json, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn get_optional_str(params: &serde_json::Value, key: &str) -> Result<Option<String>, HandlerErr> {
    match params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s.to_string())),
        Some(_) => Err(HandlerErr::bad_params(format!("{} must be a string", key))),
    }
}

/// Commits one cell edit. Roster edits never trigger a lookup.
fn roster_set_row(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let row = params
        .get("row")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| HandlerErr::bad_params("missing row"))? as usize;
    let name = get_optional_str(params, "name")?;
    let reg_no = get_optional_str(params, "regNo")?;

    let rows = state.form.roster().rows().len();
    let Some(entry) = state.form.roster_mut().row_mut(row) else {
        return Err(HandlerErr {
            code: "bad_params",
            message: "row out of range".to_string(),
            details: Some(json!({ "row": row, "rows": rows })),
        });
    };
    if let Some(name) = name {
        entry.name = name;
    }
    if let Some(reg_no) = reg_no {
        entry.reg_no = reg_no;
    }
    Ok(json!({ "sheet": sheet_json(state) }))
}

fn handle_roster_set_row(state: &mut AppState, req: &Request) -> serde_json::Value {
    match roster_set_row(state, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_roster_clear(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.form.roster_mut().clear();
    ok(&req.id, json!({ "sheet": sheet_json(state) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "roster.setRow" => Some(handle_roster_set_row(state, req)),
        "roster.clear" => Some(handle_roster_clear(state, req)),
        _ => None,
    }
}
