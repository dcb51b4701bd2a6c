use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_attendanced");
    let mut child = Command::new(exe)
        .env_remove("ATTENDANCED_WORKSPACE")
        .env_remove("ATTENDANCED_ROSTER_ROWS")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn attendanced");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn send_line(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    line: &str,
) -> serde_json::Value {
    writeln!(stdin, "{}", line).expect("write request");
    stdin.flush().expect("flush request");
    let mut out = String::new();
    reader.read_line(&mut out).expect("read response line");
    assert!(!out.trim().is_empty(), "empty response for {}", line);
    serde_json::from_str(out.trim()).expect("parse response json")
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    let value = send_line(stdin, reader, &payload.to_string());
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn error_code(value: &serde_json::Value) -> Option<&str> {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
}

#[test]
fn router_dispatch_and_error_envelopes() {
    let workspace = temp_dir("attendanced-router-smoke");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let health = request(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health.get("ok").and_then(|v| v.as_bool()), Some(true));
    assert_eq!(
        health
            .get("result")
            .and_then(|r| r.get("rosterRows"))
            .and_then(|v| v.as_u64()),
        Some(20)
    );
    assert!(health
        .get("result")
        .and_then(|r| r.get("workspacePath"))
        .map(|v| v.is_null())
        .unwrap_or(false));

    // Saving before a workspace exists is refused.
    let save = request(&mut stdin, &mut reader, "2", "sheet.save", json!({}));
    assert_eq!(error_code(&save), Some("no_workspace"));

    // Field edits still work; the lookup is simply skipped.
    let edit = request(
        &mut stdin,
        &mut reader,
        "3",
        "sheet.setField",
        json!({ "field": "program", "value": "Day" }),
    );
    assert_eq!(edit.get("ok").and_then(|v| v.as_bool()), Some(true));

    let bad_field = request(
        &mut stdin,
        &mut reader,
        "4",
        "sheet.setField",
        json!({ "field": "room", "value": "B12" }),
    );
    assert_eq!(error_code(&bad_field), Some("bad_params"));

    let bad_date = request(
        &mut stdin,
        &mut reader,
        "5",
        "sheet.setField",
        json!({ "field": "date", "value": "10/01/2024" }),
    );
    assert_eq!(error_code(&bad_date), Some("bad_params"));

    let bad_program = request(
        &mut stdin,
        &mut reader,
        "6",
        "sheet.setFields",
        json!({ "fields": { "faculty": "Law", "program": "Evening" } }),
    );
    assert_eq!(error_code(&bad_program), Some("bad_params"));
    // Nothing from a rejected batch is applied.
    let sheet = request(&mut stdin, &mut reader, "7", "sheet.get", json!({}));
    assert_eq!(
        sheet
            .get("result")
            .and_then(|s| s.get("faculty"))
            .and_then(|v| v.as_str()),
        Some("")
    );

    let bad_row = request(
        &mut stdin,
        &mut reader,
        "8",
        "roster.setRow",
        json!({ "row": 20, "name": "Late", "regNo": "R99" }),
    );
    assert_eq!(error_code(&bad_row), Some("bad_params"));

    let unknown = request(&mut stdin, &mut reader, "9", "sheet.print", json!({}));
    assert_eq!(error_code(&unknown), Some("not_implemented"));

    let missing_path = request(&mut stdin, &mut reader, "10", "workspace.select", json!({}));
    assert_eq!(error_code(&missing_path), Some("bad_params"));

    let selected = request(
        &mut stdin,
        &mut reader,
        "11",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert_eq!(selected.get("ok").and_then(|v| v.as_bool()), Some(true));
    assert!(workspace.join("attendance.sqlite3").is_file());

    let cleared = request(&mut stdin, &mut reader, "12", "roster.clear", json!({}));
    assert_eq!(cleared.get("ok").and_then(|v| v.as_bool()), Some(true));

    let garbage = send_line(&mut stdin, &mut reader, "{not json");
    assert_eq!(error_code(&garbage), Some("bad_json"));

    drop(stdin);
    let _ = child.wait();
}
