//! Keeps the on-screen sheet and the store in step: the automatic
//! load-or-clear that follows identity-key edits, and the save that upserts
//! the sheet and reconciles its roster.

use crate::error::PersistenceError;
use crate::form::{FormEvent, RosterSnapshot, SheetForm, SheetId, SheetSnapshot};
use crate::store::{SheetStore, UpsertOutcome};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Which stored sheet, if any, the form currently shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadedSheetState {
    pub id: Option<SheetId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOutcome {
    /// The key is incomplete, nothing was queried.
    Skipped,
    Loaded(SheetId),
    /// No match, and the previously loaded sheet was cleared off the form.
    Cleared,
    /// No match, and the form keeps what the user typed.
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveResult {
    pub sheet_id: SheetId,
    pub created: bool,
    pub students_inserted: usize,
    pub students_updated: usize,
}

impl SaveResult {
    /// Message shown to the user after a successful save.
    pub fn summary(&self) -> String {
        let mut message = if self.created {
            "Attendance saved successfully!".to_string()
        } else {
            "Attendance updated successfully!".to_string()
        };
        if self.students_inserted > 0 || self.students_updated > 0 {
            message.push_str(&format!(
                "\n({} student(s) added, {} updated)",
                self.students_inserted, self.students_updated
            ));
        }
        message
    }
}

pub fn handle_event<S: SheetStore + ?Sized>(
    store: &S,
    event: FormEvent,
    form: &mut SheetForm,
    loaded: &mut LoadedSheetState,
) -> Result<LookupOutcome, PersistenceError> {
    match event {
        FormEvent::IdentityKeyChanged => lookup(store, form, loaded),
    }
}

/// Loads the stored sheet matching the form's key, or clears a previously
/// loaded one when the key no longer matches anything.
pub fn lookup<S: SheetStore + ?Sized>(
    store: &S,
    form: &mut SheetForm,
    loaded: &mut LoadedSheetState,
) -> Result<LookupOutcome, PersistenceError> {
    if !form.is_complete() {
        return Ok(LookupOutcome::Skipped);
    }
    match store.find_sheet_by_identity(&form.key())? {
        Some(id) => {
            let details = store.load_sheet(id)?;
            let students = store.list_students(id)?;
            debug!(sheet_id = id, students = students.len(), "loaded stored sheet");
            form.load(details, students);
            loaded.id = Some(id);
            Ok(LookupOutcome::Loaded(id))
        }
        None if loaded.id.is_some() => {
            debug!(previous = ?loaded.id, "key no longer matches, clearing form");
            form.clear_loaded();
            loaded.id = None;
            Ok(LookupOutcome::Cleared)
        }
        None => Ok(LookupOutcome::Unchanged),
    }
}

/// Writes the sheet and its filled roster rows. Statements run one by one, so a
/// failure part way leaves the earlier ones applied.
pub fn save<S: SheetStore + ?Sized>(
    store: &S,
    sheet: &SheetSnapshot,
) -> Result<SaveResult, PersistenceError> {
    let (sheet_id, created) = match store.find_sheet_by_identity(&sheet.key)? {
        Some(id) => {
            store.update_sheet(id, &sheet.details)?;
            (id, false)
        }
        None => (store.insert_sheet(&sheet.key, &sheet.details)?, true),
    };

    if !created {
        let removed = remove_dropped_students(store, sheet_id, &sheet.roster)?;
        if removed > 0 {
            info!(sheet_id, removed, "removed students no longer on the roster");
        }
    }

    let mut result = SaveResult {
        sheet_id,
        created,
        students_inserted: 0,
        students_updated: 0,
    };
    for entry in sheet.roster.filled() {
        match store.upsert_student(sheet_id, &entry.name, &entry.reg_no)? {
            UpsertOutcome::Inserted => result.students_inserted += 1,
            UpsertOutcome::Updated => result.students_updated += 1,
            UpsertOutcome::Unchanged => {}
        }
    }
    info!(
        sheet_id,
        created,
        inserted = result.students_inserted,
        updated = result.students_updated,
        "sheet saved"
    );
    Ok(result)
}

fn remove_dropped_students<S: SheetStore + ?Sized>(
    store: &S,
    sheet_id: SheetId,
    roster: &RosterSnapshot,
) -> Result<usize, PersistenceError> {
    let kept = roster.kept_reg_nos();
    let stored: BTreeSet<String> = store
        .list_students(sheet_id)?
        .into_iter()
        .map(|s| s.reg_no)
        .collect();
    let mut removed = 0;
    for reg_no in stored.iter().filter(|r| !kept.contains(r.as_str())) {
        store.delete_student(sheet_id, reg_no)?;
        removed += 1;
    }
    Ok(removed)
}
