use crate::form::{FormEvent, Program, SheetField, SheetForm};
use crate::ipc::error::ok;
use crate::ipc::helpers::{get_required_str, lookup_json, open_store, sheet_json, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::sync::{self, LookupOutcome};
use chrono::NaiveDate;
use serde_json::json;

enum FieldValue {
    Program(Option<Program>),
    Date(Option<NaiveDate>),
    Text(String),
}

fn parse_field(
    name: &str,
    value: &serde_json::Value,
) -> Result<(SheetField, FieldValue), HandlerErr> {
    let field = SheetField::parse(name)
        .ok_or_else(|| HandlerErr::bad_params(format!("unknown field: {}", name)))?;
    let text = match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.as_str()),
        _ => {
            return Err(HandlerErr::bad_params(format!(
                "{} must be a string or null",
                name
            )))
        }
    };
    let parsed = match field {
        SheetField::Program => match text.map(str::trim).filter(|s| !s.is_empty()) {
            None => FieldValue::Program(None),
            Some(raw) => FieldValue::Program(Some(Program::parse(raw).ok_or_else(|| {
                HandlerErr::bad_params("program must be Day or Weekend")
            })?)),
        },
        SheetField::Date => match text.map(str::trim).filter(|s| !s.is_empty()) {
            None => FieldValue::Date(None),
            Some(raw) => FieldValue::Date(Some(
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .map_err(|_| HandlerErr::bad_params("date must be YYYY-MM-DD"))?,
            )),
        },
        _ => FieldValue::Text(text.unwrap_or_default().to_string()),
    };
    Ok((field, parsed))
}

fn apply_field(form: &mut SheetForm, field: SheetField, value: FieldValue) -> Option<FormEvent> {
    match value {
        FieldValue::Program(p) => form.set_program(p),
        FieldValue::Date(d) => form.set_date(d),
        FieldValue::Text(s) => form.set_text(field, s),
    }
}

/// Runs the automatic lookup that follows an identity-key edit. Without a
/// workspace, or with an incomplete key, nothing is queried.
fn dispatch(
    state: &mut AppState,
    event: Option<FormEvent>,
) -> Result<Option<LookupOutcome>, HandlerErr> {
    let Some(event) = event else {
        return Ok(None);
    };
    if state.workspace.is_none() || !state.form.is_complete() {
        return Ok(Some(LookupOutcome::Skipped));
    }
    let conn = open_store(state)?;
    let outcome = sync::handle_event(&conn, event, &mut state.form, &mut state.loaded)?;
    Ok(Some(outcome))
}

/// A failed lookup does not roll back the edit that triggered it, so the
/// error carries the form as it now stands under `details.sheet`.
fn lookup_failed(state: &AppState, mut error: HandlerErr) -> HandlerErr {
    error.details = Some(json!({ "sheet": sheet_json(state) }));
    error
}

/// Applies one field edit and runs the lookup it triggers. Bad params leave
/// the form alone; a persistence failure keeps the edit (see `lookup_failed`).
fn sheet_set_field(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let name = get_required_str(params, "field")?;
    let value = params.get("value").unwrap_or(&serde_json::Value::Null);
    let (field, value) = parse_field(name, value)?;
    let event = apply_field(&mut state.form, field, value);
    let lookup = match dispatch(state, event) {
        Ok(v) => v,
        Err(e) => return Err(lookup_failed(state, e)),
    };
    Ok(json!({ "sheet": sheet_json(state), "lookup": lookup_json(lookup) }))
}

fn sheet_set_fields(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let Some(fields) = params.get("fields").and_then(|v| v.as_object()) else {
        return Err(HandlerErr::bad_params("missing fields"));
    };
    // Validate everything before touching the form.
    let parsed = fields
        .iter()
        .map(|(name, value)| parse_field(name, value))
        .collect::<Result<Vec<_>, _>>()?;
    let mut event = None;
    for (field, value) in parsed {
        event = apply_field(&mut state.form, field, value).or(event);
    }
    let lookup = match dispatch(state, event) {
        Ok(v) => v,
        Err(e) => return Err(lookup_failed(state, e)),
    };
    Ok(json!({ "sheet": sheet_json(state), "lookup": lookup_json(lookup) }))
}

fn sheet_save(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let conn = open_store(state)?;
    let snapshot = state.form.snapshot();
    let result = sync::save(&conn, &snapshot)?;
    Ok(json!({
        "sheetId": result.sheet_id,
        "created": result.created,
        "studentsInserted": result.students_inserted,
        "studentsUpdated": result.students_updated,
        "message": result.summary(),
    }))
}

fn handle_sheet_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, sheet_json(state))
}

fn handle_sheet_set_field(state: &mut AppState, req: &Request) -> serde_json::Value {
    match sheet_set_field(state, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_sheet_set_fields(state: &mut AppState, req: &Request) -> serde_json::Value {
    match sheet_set_fields(state, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_sheet_save(state: &mut AppState, req: &Request) -> serde_json::Value {
    match sheet_save(state) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_sheet_reset(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.reset_form();
    ok(&req.id, sheet_json(state))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "sheet.get" => Some(handle_sheet_get(state, req)),
        "sheet.setField" => Some(handle_sheet_set_field(state, req)),
        "sheet.setFields" => Some(handle_sheet_set_fields(state, req)),
        "sheet.save" => Some(handle_sheet_save(state, req)),
        "sheet.reset" => Some(handle_sheet_reset(state, req)),
        _ => None,
    }
}
