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

fn spawn_sidecar(today: &str) -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_attendanced");
    let mut child = Command::new(exe)
        .env("ATTENDANCED_TODAY", today)
        .env_remove("ATTENDANCED_WORKSPACE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn attendanced");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
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
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_default()
}

fn error_code(value: &serde_json::Value) -> &str {
    value
        .pointer("/error/code")
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

#[test]
fn requests_before_workspace_select_are_rejected() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar("2024-03-15");

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health["today"], "2024-03-15");
    assert!(health["workspacePath"].is_null());

    for (i, method) in [
        "roster.list",
        "holidays.list",
        "settings.get",
        "attendance.status",
        "calendar.month",
        "backup.export",
    ]
    .iter()
    .enumerate()
    {
        let resp = request(
            &mut stdin,
            &mut reader,
            &format!("nw-{}", i),
            method,
            json!({}),
        );
        assert_eq!(error_code(&resp), "no_workspace", "{}", method);
    }

    let unknown = request(&mut stdin, &mut reader, "2", "grades.compute", json!({}));
    assert_eq!(error_code(&unknown), "not_implemented");

    writeln!(stdin, "{{not json").expect("write garbage");
    stdin.flush().expect("flush");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read bad_json reply");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("json reply");
    assert_eq!(error_code(&value), "bad_json");

    // The loop keeps serving after a malformed line.
    request_ok(&mut stdin, &mut reader, "3", "health", json!({}));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("attendance-router-smoke");
    let restore_to = temp_dir("attendance-router-smoke-restore");
    let bundle_out = workspace.join("smoke-backup.zip");

    let (mut child, mut stdin, mut reader) = spawn_sidecar("2024-03-15");

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let health = request_ok(&mut stdin, &mut reader, "2", "health", json!({}));
    assert!(health["workspacePath"].is_string());

    request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "roster.set",
        json!({
            "classes": [{ "id": "9A", "name": "9A" }],
            "students": [
                { "id": "p", "name": "Priya", "rollNumber": "\u{0967}", "class": "9A", "status": "active" },
                { "id": "q", "name": "Quinn", "rollNumber": "\u{0662}", "class": "9A", "status": "active" }
            ]
        }),
    );
    let dup = request(
        &mut stdin,
        &mut reader,
        "4",
        "roster.set",
        json!({
            "classes": [{ "id": "9A", "name": "9A" }],
            "students": [
                { "id": "p", "name": "Priya", "class": "9A", "status": "active" },
                { "id": "p", "name": "Again", "class": "9A", "status": "active" }
            ]
        }),
    );
    assert_eq!(error_code(&dup), "bad_params");

    let settings = request_ok(&mut stdin, &mut reader, "5", "settings.get", json!({}));
    assert!(settings["academicYearStart"].is_null());
    let set = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "settings.setAcademicYearStart",
        json!({ "date": "2024-03-01" }),
    );
    assert_eq!(set["academicYearStart"], "2024-03-01");

    let early = request(
        &mut stdin,
        &mut reader,
        "7",
        "attendance.openDay",
        json!({ "date": "2024-02-28" }),
    );
    assert_eq!(error_code(&early), "before_academic_year");

    let feb = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "calendar.month",
        json!({ "month": "2024-02" }),
    );
    let categories: Vec<&str> = feb["days"]
        .as_array()
        .expect("days")
        .iter()
        .filter(|d| !d["date"].is_null())
        .filter_map(|d| d["category"].as_str())
        .collect();
    assert_eq!(categories.len(), 29);
    assert!(categories.iter().all(|c| *c == "before-academic-year"));

    let bad_month = request(
        &mut stdin,
        &mut reader,
        "9",
        "calendar.month",
        json!({ "month": "2024-13" }),
    );
    assert_eq!(error_code(&bad_month), "bad_params");

    // Devanagari one sorts ahead of Arabic-Indic two.
    let day = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "attendance.openDay",
        json!({ "date": "2024-03-04" }),
    );
    let order: Vec<&str> = day["rows"]
        .as_array()
        .expect("rows")
        .iter()
        .filter_map(|r| r["studentId"].as_str())
        .collect();
    assert_eq!(order, vec!["p", "q"]);
    request_ok(
        &mut stdin,
        &mut reader,
        "11",
        "attendance.save",
        json!({ "date": "2024-03-04" }),
    );

    let exported = request_ok(
        &mut stdin,
        &mut reader,
        "12",
        "backup.export",
        json!({ "outPath": bundle_out.to_string_lossy() }),
    );
    assert_eq!(exported["bundleFormat"], "attendance-bundle-v1");
    assert_eq!(exported["students"], 2);
    assert_eq!(exported["dates"], 1);
    assert!(bundle_out.is_file());

    request_ok(
        &mut stdin,
        &mut reader,
        "13",
        "workspace.select",
        json!({ "path": restore_to.to_string_lossy() }),
    );
    let imported = request_ok(
        &mut stdin,
        &mut reader,
        "14",
        "backup.import",
        json!({ "inPath": bundle_out.to_string_lossy() }),
    );
    assert_eq!(imported["dates"], 1);
    assert_eq!(imported["students"], 2);

    let status = request_ok(&mut stdin, &mut reader, "15", "attendance.status", json!({}));
    assert_eq!(status["savedDates"], json!(["2024-03-04"]));
    assert_eq!(status["academicYearStart"], "2024-03-01");
    let roster = request_ok(&mut stdin, &mut reader, "16", "roster.list", json!({}));
    assert_eq!(roster["students"].as_array().map(|a| a.len()), Some(2));

    let cleared = request_ok(
        &mut stdin,
        &mut reader,
        "17",
        "settings.setAcademicYearStart",
        json!({ "date": null }),
    );
    assert!(cleared["academicYearStart"].is_null());

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
    let _ = std::fs::remove_dir_all(restore_to);
}

#[test]
fn failed_import_keeps_unsaved_drafts() {
    let workspace = temp_dir("attendance-import-fail");
    let junk = workspace.join("junk.zip");
    std::fs::write(&junk, b"PK\x03\x04 but not really").expect("write junk");

    let (mut child, mut stdin, mut reader) = spawn_sidecar("2024-03-15");
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "roster.set",
        json!({
            "classes": [{ "id": "9A", "name": "9A" }],
            "students": [
                { "id": "s1", "name": "Sam", "rollNumber": "1", "class": "9A", "status": "active" }
            ]
        }),
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "attendance.toggle",
        json!({ "date": "2024-03-15", "studentId": "s1" }),
    );
    let before = request_ok(&mut stdin, &mut reader, "4", "attendance.status", json!({}));
    assert_eq!(before["draftDates"], json!(["2024-03-15"]));

    let missing = request(
        &mut stdin,
        &mut reader,
        "5",
        "backup.import",
        json!({ "inPath": workspace.join("nope.zip").to_string_lossy() }),
    );
    assert_eq!(error_code(&missing), "invalid_bundle");
    let broken = request(
        &mut stdin,
        &mut reader,
        "6",
        "backup.import",
        json!({ "inPath": junk.to_string_lossy() }),
    );
    assert_eq!(error_code(&broken), "invalid_bundle");

    let after = request_ok(&mut stdin, &mut reader, "7", "attendance.status", json!({}));
    assert_eq!(after["draftDates"], before["draftDates"]);
    assert_eq!(after["sessionId"], before["sessionId"]);
    let day = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "attendance.openDay",
        json!({ "date": "2024-03-15" }),
    );
    assert_eq!(day["rows"][0]["status"], "present");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn malformed_lines_get_bad_json_and_the_loop_keeps_going() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar("2024-03-15");

    for raw in [&[0xff, 0xfe, b'\n'][..], &b"{not json\n"[..]] {
        stdin.write_all(raw).expect("write raw line");
        stdin.flush().expect("flush raw line");
        let mut line = String::new();
        reader.read_line(&mut line).expect("read response line");
        let value: serde_json::Value =
            serde_json::from_str(line.trim()).expect("parse response json");
        assert_eq!(value["ok"], false);
        assert_eq!(error_code(&value), "bad_json");
    }

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health["today"], "2024-03-15");

    drop(stdin);
    let _ = child.wait();
}
