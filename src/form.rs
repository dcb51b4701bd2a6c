use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashSet;

pub const DEFAULT_ROSTER_ROWS: usize = 20;

pub type SheetId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Program {
    Day,
    Weekend,
}

impl Program {
    pub fn as_str(self) -> &'static str {
        match self {
            Program::Day => "Day",
            Program::Weekend => "Weekend",
        }
    }

    pub fn parse(raw: &str) -> Option<Program> {
        match raw.trim() {
            "Day" | "day" => Some(Program::Day),
            "Weekend" | "weekend" => Some(Program::Weekend),
            _ => None,
        }
    }
}

/// The seven columns a sheet is looked up by. Two sheets with an equal key are
/// the same sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetKey {
    pub program: Program,
    pub faculty: String,
    pub department: String,
    pub course_unit: String,
    pub lecturer: String,
    pub date: Option<NaiveDate>,
    pub time: String,
}

/// The columns that stay editable after a sheet has been created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetDetails {
    pub coordinator_name: String,
    pub coordinator_phone: String,
    pub comments: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentEntry {
    pub name: String,
    pub reg_no: String,
}

impl StudentEntry {
    pub fn new(name: impl Into<String>, reg_no: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reg_no: reg_no.into(),
        }
    }

    /// Only rows with both a name and a registration number are ever persisted.
    pub fn is_filled(&self) -> bool {
        !self.name.is_empty() && !self.reg_no.is_empty()
    }
}

/// Fixed-height roster grid. Rows beyond the persisted students are blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    rows: Vec<StudentEntry>,
    row_count: usize,
}

impl Roster {
    pub fn blank(row_count: usize) -> Self {
        Self {
            rows: vec![StudentEntry::default(); row_count],
            row_count,
        }
    }

    /// Builds a roster from stored students, padding with blank rows. A stored
    /// list longer than `row_count` is kept whole.
    pub fn from_students(students: Vec<StudentEntry>, row_count: usize) -> Self {
        let mut rows = students;
        if rows.len() < row_count {
            rows.resize(row_count, StudentEntry::default());
        }
        Self { rows, row_count }
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn rows(&self) -> &[StudentEntry] {
        &self.rows
    }

    pub fn row_mut(&mut self, idx: usize) -> Option<&mut StudentEntry> {
        self.rows.get_mut(idx)
    }

    pub fn clear(&mut self) {
        *self = Roster::blank(self.row_count);
    }

    /// Copy of the committed rows, taken at save time.
    pub fn snapshot(&self) -> RosterSnapshot {
        RosterSnapshot {
            rows: self.rows.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterSnapshot {
    rows: Vec<StudentEntry>,
}

impl RosterSnapshot {
    pub fn filled(&self) -> impl Iterator<Item = &StudentEntry> {
        self.rows.iter().filter(|r| r.is_filled())
    }

    /// Registration numbers the user kept on the grid. A row with a reg number
    /// but no name still protects the stored student from deletion.
    pub fn kept_reg_nos(&self) -> HashSet<&str> {
        self.rows
            .iter()
            .filter(|r| !r.reg_no.is_empty())
            .map(|r| r.reg_no.as_str())
            .collect()
    }
}

/// Everything `save` needs, read from the form in one go.
#[derive(Debug, Clone)]
pub struct SheetSnapshot {
    pub key: SheetKey,
    pub details: SheetDetails,
    pub roster: RosterSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetField {
    Program,
    Faculty,
    Department,
    CourseUnit,
    Lecturer,
    Date,
    Time,
    CoordinatorName,
    CoordinatorPhone,
    Comments,
}

impl SheetField {
    pub fn parse(raw: &str) -> Option<SheetField> {
        Some(match raw {
            "program" => SheetField::Program,
            "faculty" => SheetField::Faculty,
            "department" => SheetField::Department,
            "courseUnit" => SheetField::CourseUnit,
            "lecturer" => SheetField::Lecturer,
            "date" => SheetField::Date,
            "time" => SheetField::Time,
            "coordinatorName" => SheetField::CoordinatorName,
            "coordinatorPhone" => SheetField::CoordinatorPhone,
            "comments" => SheetField::Comments,
            _ => return None,
        })
    }

    pub fn is_identity(self) -> bool {
        !matches!(
            self,
            SheetField::CoordinatorName | SheetField::CoordinatorPhone | SheetField::Comments
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormEvent {
    IdentityKeyChanged,
}

#[derive(Debug, Clone)]
pub struct SheetForm {
    program: Option<Program>,
    faculty: String,
    department: String,
    course_unit: String,
    lecturer: String,
    date: Option<NaiveDate>,
    time: String,
    details: SheetDetails,
    roster: Roster,
}

impl SheetForm {
    pub fn new(row_count: usize) -> Self {
        Self {
            program: None,
            faculty: String::new(),
            department: String::new(),
            course_unit: String::new(),
            lecturer: String::new(),
            date: None,
            time: String::new(),
            details: SheetDetails::default(),
            roster: Roster::blank(row_count),
        }
    }

    /// A fresh form as the user first sees it: dated today, timed to the
    /// current minute.
    pub fn starting_at(now: NaiveDateTime, row_count: usize) -> Self {
        let mut form = SheetForm::new(row_count);
        form.date = Some(now.date());
        form.time = now.format("%H:%M").to_string();
        form
    }

    pub fn program(&self) -> Option<Program> {
        self.program
    }

    pub fn faculty(&self) -> &str {
        &self.faculty
    }

    pub fn department(&self) -> &str {
        &self.department
    }

    pub fn course_unit(&self) -> &str {
        &self.course_unit
    }

    pub fn lecturer(&self) -> &str {
        &self.lecturer
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn time(&self) -> &str {
        &self.time
    }

    pub fn details(&self) -> &SheetDetails {
        &self.details
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn roster_mut(&mut self) -> &mut Roster {
        &mut self.roster
    }

    pub fn set_program(&mut self, program: Option<Program>) -> Option<FormEvent> {
        if self.program == program {
            return None;
        }
        self.program = program;
        Some(FormEvent::IdentityKeyChanged)
    }

    pub fn set_date(&mut self, date: Option<NaiveDate>) -> Option<FormEvent> {
        if self.date == date {
            return None;
        }
        self.date = date;
        Some(FormEvent::IdentityKeyChanged)
    }

    /// Sets one of the free-text fields. Returns the event to dispatch when an
    /// identity-key field actually changed.
    pub fn set_text(&mut self, field: SheetField, value: String) -> Option<FormEvent> {
        let slot = match field {
            SheetField::Faculty => &mut self.faculty,
            SheetField::Department => &mut self.department,
            SheetField::CourseUnit => &mut self.course_unit,
            SheetField::Lecturer => &mut self.lecturer,
            SheetField::Time => &mut self.time,
            SheetField::CoordinatorName => &mut self.details.coordinator_name,
            SheetField::CoordinatorPhone => &mut self.details.coordinator_phone,
            SheetField::Comments => &mut self.details.comments,
            SheetField::Program | SheetField::Date => return None,
        };
        if *slot == value {
            return None;
        }
        *slot = value;
        field
            .is_identity()
            .then_some(FormEvent::IdentityKeyChanged)
    }

    /// True when every identity-key field is filled in, which is what allows an
    /// automatic lookup.
    pub fn is_complete(&self) -> bool {
        self.program.is_some()
            && !self.faculty.is_empty()
            && !self.department.is_empty()
            && !self.course_unit.is_empty()
            && !self.lecturer.is_empty()
            && self.date.is_some()
            && !self.time.is_empty()
    }

    /// The lookup key. An unselected program resolves to `Weekend`, like the
    /// form's radio group.
    pub fn key(&self) -> SheetKey {
        SheetKey {
            program: self.program.unwrap_or(Program::Weekend),
            faculty: self.faculty.clone(),
            department: self.department.clone(),
            course_unit: self.course_unit.clone(),
            lecturer: self.lecturer.clone(),
            date: self.date,
            time: self.time.clone(),
        }
    }

    pub fn snapshot(&self) -> SheetSnapshot {
        SheetSnapshot {
            key: self.key(),
            details: self.details.clone(),
            roster: self.roster.snapshot(),
        }
    }

    /// Replaces coordinator fields, comments and the roster with a stored sheet.
    pub fn load(&mut self, details: SheetDetails, students: Vec<StudentEntry>) {
        let row_count = self.roster.row_count();
        self.details = details;
        self.roster = Roster::from_students(students, row_count);
    }

    /// Drops what a previous lookup loaded. Identity fields stay as typed.
    pub fn clear_loaded(&mut self) {
        self.details = SheetDetails::default();
        self.roster.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_form() -> SheetForm {
        let mut form = SheetForm::new(DEFAULT_ROSTER_ROWS);
        form.set_program(Some(Program::Day));
        form.set_text(SheetField::Faculty, "F".into());
        form.set_text(SheetField::Department, "D".into());
        form.set_text(SheetField::CourseUnit, "C101".into());
        form.set_text(SheetField::Lecturer, "L".into());
        form.set_date(NaiveDate::from_ymd_opt(2024, 1, 10));
        form.set_text(SheetField::Time, "09:00".into());
        form
    }

    #[test]
    fn complete_requires_every_identity_field() {
        let form = complete_form();
        assert!(form.is_complete());

        let mut no_program = form.clone();
        no_program.set_program(None);
        assert!(!no_program.is_complete());

        let mut no_date = form.clone();
        no_date.set_date(None);
        assert!(!no_date.is_complete());

        let mut no_time = form.clone();
        no_time.set_text(SheetField::Time, String::new());
        assert!(!no_time.is_complete());

        // Details are not part of the key.
        let mut with_comments = form;
        with_comments.set_text(SheetField::Comments, "late start".into());
        assert!(with_comments.is_complete());
    }

    #[test]
    fn only_changed_identity_fields_emit_events() {
        let mut form = complete_form();
        assert_eq!(form.set_text(SheetField::Faculty, "F".into()), None);
        assert_eq!(
            form.set_text(SheetField::Faculty, "Science".into()),
            Some(FormEvent::IdentityKeyChanged)
        );
        assert_eq!(form.set_text(SheetField::CoordinatorName, "Ann".into()), None);
        assert_eq!(form.details().coordinator_name, "Ann");
        assert_eq!(form.set_program(Some(Program::Day)), None);
        assert_eq!(
            form.set_program(Some(Program::Weekend)),
            Some(FormEvent::IdentityKeyChanged)
        );
    }

    #[test]
    fn roster_pads_but_never_truncates() {
        let short = Roster::from_students(vec![StudentEntry::new("A", "R1")], 3);
        assert_eq!(short.rows().len(), 3);
        assert_eq!(short.rows()[1], StudentEntry::default());

        let long = Roster::from_students(
            (0..5)
                .map(|i| StudentEntry::new(format!("N{i}"), format!("R{i}")))
                .collect(),
            3,
        );
        assert_eq!(long.rows().len(), 5);
        assert_eq!(long.row_count(), 3);
    }

    #[test]
    fn snapshot_ignores_later_edits_and_half_rows() {
        let mut form = complete_form();
        *form.roster_mut().row_mut(0).expect("row 0") = StudentEntry::new("Alice", "R1");
        *form.roster_mut().row_mut(1).expect("row 1") = StudentEntry::new("", "R2");
        *form.roster_mut().row_mut(2).expect("row 2") = StudentEntry::new("Bob", "");

        let snap = form.snapshot();
        form.roster_mut().row_mut(0).expect("row 0").name = "Changed".into();

        let filled: Vec<_> = snap.roster.filled().cloned().collect();
        assert_eq!(filled, vec![StudentEntry::new("Alice", "R1")]);
        let kept = snap.roster.kept_reg_nos();
        assert!(kept.contains("R1") && kept.contains("R2"));
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn unselected_program_keys_as_weekend() {
        let mut form = complete_form();
        form.set_program(None);
        assert_eq!(form.key().program, Program::Weekend);
    }

    #[test]
    fn starting_form_is_dated_now() {
        let now = NaiveDate::from_ymd_opt(2024, 3, 5)
            .and_then(|d| d.and_hms_opt(14, 7, 31))
            .expect("valid datetime");
        let form = SheetForm::starting_at(now, 4);
        assert_eq!(form.date(), NaiveDate::from_ymd_opt(2024, 3, 5));
        assert_eq!(form.time(), "14:07");
        assert_eq!(form.roster().rows().len(), 4);
        assert!(!form.is_complete());
    }

    #[test]
    fn clear_loaded_keeps_identity() {
        let mut form = complete_form();
        form.load(
            SheetDetails {
                coordinator_name: "Ann".into(),
                coordinator_phone: "0700".into(),
                comments: "ok".into(),
            },
            vec![StudentEntry::new("Alice", "R1")],
        );
        assert_eq!(form.roster().rows()[0].name, "Alice");
        form.clear_loaded();
        assert_eq!(form.details(), &SheetDetails::default());
        assert!(form.roster().rows().iter().all(|r| !r.is_filled()));
        assert_eq!(form.roster().rows().len(), DEFAULT_ROSTER_ROWS);
        assert_eq!(form.faculty(), "F");
    }
}
