use crate::error::PersistenceError;
use crate::form::{SheetDetails, SheetId, SheetKey, StudentEntry};
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension};

pub type StoreResult<T> = Result<T, PersistenceError>;

/// What an `upsert_student` call did to the stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    /// The stored name already matched; nothing was written.
    Unchanged,
}

/// The persistence sink behind the attendance form.
pub trait SheetStore {
    fn find_sheet_by_identity(&self, key: &SheetKey) -> StoreResult<Option<SheetId>>;
    fn update_sheet(&self, id: SheetId, details: &SheetDetails) -> StoreResult<()>;
    fn insert_sheet(&self, key: &SheetKey, details: &SheetDetails) -> StoreResult<SheetId>;
    fn load_sheet(&self, id: SheetId) -> StoreResult<SheetDetails>;
    /// Students in insertion order.
    fn list_students(&self, sheet_id: SheetId) -> StoreResult<Vec<StudentEntry>>;
    fn delete_student(&self, sheet_id: SheetId, reg_no: &str) -> StoreResult<()>;
    fn upsert_student(&self, sheet_id: SheetId, name: &str, reg_no: &str)
        -> StoreResult<UpsertOutcome>;
}

fn date_param(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format("%Y-%m-%d").to_string())
}

fn now_stamp() -> String {
    Utc::now().to_rfc3339()
}

impl SheetStore for Connection {
    fn find_sheet_by_identity(&self, key: &SheetKey) -> StoreResult<Option<SheetId>> {
        let id = self
            .query_row(
                "SELECT id FROM attendance_sheets
                 WHERE program = ? AND faculty = ? AND department = ? AND course_unit = ?
                   AND lecturer = ? AND submitted_at IS ? AND submitted_at_time = ?
                 ORDER BY id
                 LIMIT 1",
                (
                    key.program.as_str(),
                    &key.faculty,
                    &key.department,
                    &key.course_unit,
                    &key.lecturer,
                    date_param(key.date),
                    &key.time,
                ),
                |r| r.get::<_, i64>(0),
            )
            .optional()?;
        Ok(id)
    }

    fn update_sheet(&self, id: SheetId, details: &SheetDetails) -> StoreResult<()> {
        self.execute(
            "UPDATE attendance_sheets
             SET class_coordinator_name = ?, class_coordinator_telephone = ?, comments = ?,
                 updated_at = ?
             WHERE id = ?",
            (
                &details.coordinator_name,
                &details.coordinator_phone,
                &details.comments,
                now_stamp(),
                id,
            ),
        )?;
        Ok(())
    }

    fn insert_sheet(&self, key: &SheetKey, details: &SheetDetails) -> StoreResult<SheetId> {
        let stamp = now_stamp();
        self.execute(
            "INSERT INTO attendance_sheets(
                program, faculty, department, course_unit, lecturer,
                submitted_at, submitted_at_time,
                class_coordinator_name, class_coordinator_telephone, comments,
                created_at, updated_at
             ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            rusqlite::params![
                key.program.as_str(),
                &key.faculty,
                &key.department,
                &key.course_unit,
                &key.lecturer,
                date_param(key.date),
                &key.time,
                &details.coordinator_name,
                &details.coordinator_phone,
                &details.comments,
                &stamp,
                &stamp,
            ],
        )?;
        Ok(self.last_insert_rowid())
    }

    fn load_sheet(&self, id: SheetId) -> StoreResult<SheetDetails> {
        let details = self.query_row(
            "SELECT class_coordinator_name, class_coordinator_telephone, comments
             FROM attendance_sheets
             WHERE id = ?",
            [id],
            |r| {
                Ok(SheetDetails {
                    coordinator_name: r.get::<_, Option<String>>(0)?.unwrap_or_default(),
                    coordinator_phone: r.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    comments: r.get::<_, Option<String>>(2)?.unwrap_or_default(),
                })
            },
        )?;
        Ok(details)
    }

    fn list_students(&self, sheet_id: SheetId) -> StoreResult<Vec<StudentEntry>> {
        let mut stmt = self.prepare(
            "SELECT student_name, reg_no
             FROM students
             WHERE attendance_sheet_id = ?
             ORDER BY id",
        )?;
        let students = stmt
            .query_map([sheet_id], |r| {
                Ok(StudentEntry::new(
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(students)
    }

    fn delete_student(&self, sheet_id: SheetId, reg_no: &str) -> StoreResult<()> {
        self.execute(
            "DELETE FROM students WHERE attendance_sheet_id = ? AND reg_no = ?",
            (sheet_id, reg_no),
        )?;
        Ok(())
    }

    fn upsert_student(
        &self,
        sheet_id: SheetId,
        name: &str,
        reg_no: &str,
    ) -> StoreResult<UpsertOutcome> {
        let existing: Option<String> = self
            .query_row(
                "SELECT student_name FROM students WHERE attendance_sheet_id = ? AND reg_no = ?",
                (sheet_id, reg_no),
                |r| r.get(0),
            )
            .optional()?;
        match existing {
            None => {
                self.execute(
                    "INSERT INTO students(attendance_sheet_id, student_name, reg_no)
                     VALUES(?, ?, ?)",
                    (sheet_id, name, reg_no),
                )?;
                Ok(UpsertOutcome::Inserted)
            }
            Some(current) if current == name => Ok(UpsertOutcome::Unchanged),
            Some(_) => {
                self.execute(
                    "UPDATE students SET student_name = ?
                     WHERE attendance_sheet_id = ? AND reg_no = ?",
                    (name, sheet_id, reg_no),
                )?;
                Ok(UpsertOutcome::Updated)
            }
        }
    }
}
