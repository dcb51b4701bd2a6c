use rusqlite::Connection;
use std::path::Path;

pub const DB_FILE_NAME: &str = "attendance.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

#[cfg(test)]
pub fn open_in_memory() -> anyhow::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(conn)
}

fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS attendance_sheets(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            program TEXT NOT NULL,
            faculty TEXT NOT NULL,
            department TEXT NOT NULL,
            course_unit TEXT NOT NULL,
            lecturer TEXT NOT NULL,
            submitted_at TEXT,
            submitted_at_time TEXT NOT NULL,
            class_coordinator_name TEXT NOT NULL DEFAULT '',
            class_coordinator_telephone TEXT NOT NULL DEFAULT '',
            comments TEXT NOT NULL DEFAULT ''
        )",
        [],
    )?;
    // Workspaces created before sheets were stamped lack these columns.
    ensure_sheets_timestamps(conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_sheets_identity ON attendance_sheets(
            program, faculty, department, course_unit, lecturer, submitted_at, submitted_at_time
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            attendance_sheet_id INTEGER NOT NULL,
            student_name TEXT NOT NULL,
            reg_no TEXT NOT NULL,
            FOREIGN KEY(attendance_sheet_id) REFERENCES attendance_sheets(id),
            UNIQUE(attendance_sheet_id, reg_no)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_sheet ON students(attendance_sheet_id)",
        [],
    )?;
    Ok(())
}

fn ensure_sheets_timestamps(conn: &Connection) -> anyhow::Result<()> {
    if !table_has_column(conn, "attendance_sheets", "created_at")? {
        conn.execute("ALTER TABLE attendance_sheets ADD COLUMN created_at TEXT", [])?;
    }
    if !table_has_column(conn, "attendance_sheets", "updated_at")? {
        conn.execute("ALTER TABLE attendance_sheets ADD COLUMN updated_at TEXT", [])?;
    }
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
