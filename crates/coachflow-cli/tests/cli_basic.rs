//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary against a throwaway data directory.

use std::path::Path;
use std::process::Command;

/// Run a CLI command and return (code, stdout, stderr).
fn run_cli(data_dir: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_coachflow"))
        .env("COACHFLOW_DATA_DIR", data_dir)
        .env_remove("COACHFLOW_LOG")
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

/// Id printed on the first line as "<Thing> created: <id>".
fn created_id(stdout: &str) -> String {
    stdout
        .lines()
        .next()
        .and_then(|line| line.split(": ").nth(1))
        .expect("created line")
        .trim()
        .to_string()
}

/// Everything after the first line, parsed as JSON.
fn body_json(stdout: &str) -> serde_json::Value {
    let body: String = stdout.lines().skip(1).collect::<Vec<_>>().join("\n");
    serde_json::from_str(&body).expect("JSON body")
}

fn create_program(dir: &Path, extra: &[&str]) -> String {
    let mut args = vec!["--org", "org-1", "program", "create", "Reset"];
    args.extend_from_slice(extra);
    let (code, stdout, stderr) = run_cli(dir, &args);
    assert_eq!(code, 0, "program create failed: {stderr}");
    created_id(&stdout)
}

#[test]
fn test_program_create_uses_config_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, _) = run_cli(dir.path(), &["config", "set", "defaults.include_weekends", "true"]);
    assert_eq!(code, 0);

    let (code, stdout, _) = run_cli(
        dir.path(),
        &["--org", "org-1", "program", "create", "Reset", "--length-days", "14"],
    );
    assert_eq!(code, 0);
    let program = body_json(&stdout);
    assert_eq!(program["lengthDays"], 14);
    assert_eq!(program["includeWeekends"], true);
    assert_eq!(program["organizationId"], "org-1");
}

#[test]
fn test_program_list_is_scoped_to_org() {
    let dir = tempfile::tempdir().unwrap();
    create_program(dir.path(), &[]);

    let (_, stdout, _) = run_cli(dir.path(), &["--org", "org-1", "program", "list", "--json"]);
    let listed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (_, stdout, _) = run_cli(dir.path(), &["--org", "org-2", "program", "list", "--json"]);
    let listed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(listed.as_array().unwrap().is_empty());
}

#[test]
fn test_ensure_enrollment_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let program_id = create_program(dir.path(), &["--length-days", "10"]);

    let (code, stdout, _) = run_cli(
        dir.path(),
        &[
            "--org", "org-1", "enrollment", "create", &program_id, "user-1", "--start", "2024-03-06",
        ],
    );
    assert_eq!(code, 0);
    let enrollment_id = created_id(&stdout);

    let ensure: [&str; 6] = ["--org", "org-1", "instance", "ensure-enrollment", &program_id, &enrollment_id];
    let (code, first, _) = run_cli(dir.path(), &ensure);
    assert_eq!(code, 0);
    let (_, second, _) = run_cli(dir.path(), &ensure);
    assert_eq!(first.trim(), second.trim());

    let (code, stdout, _) = run_cli(
        dir.path(),
        &["--org", "org-1", "instance", "day", first.trim(), "--date", "2024-03-07"],
    );
    assert_eq!(code, 0);
    let day: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(day["globalDayIndex"], 2);
}

#[test]
fn test_ensure_from_other_org_fails() {
    let dir = tempfile::tempdir().unwrap();
    let program_id = create_program(dir.path(), &[]);
    let (_, stdout, _) = run_cli(
        dir.path(),
        &["--org", "org-1", "enrollment", "create", &program_id, "user-1"],
    );
    let enrollment_id = created_id(&stdout);

    let (code, _, stderr) = run_cli(
        dir.path(),
        &["--org", "org-2", "instance", "ensure-enrollment", &program_id, &enrollment_id],
    );
    assert_ne!(code, 0);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_coaching_notes_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, _) = run_cli(
        dir.path(),
        &["--org", "org-1", "coaching", "note", "client-9", "Prefers mornings"],
    );
    assert_eq!(code, 0);

    let (code, stdout, _) = run_cli(dir.path(), &["--org", "org-1", "coaching", "show", "client-9"]);
    assert_eq!(code, 0);
    let data: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(data["notes"], "Prefers mornings");
}

#[test]
fn test_unknown_config_key_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(dir.path(), &["config", "get", "defaults.nope"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("unknown key"));
}

#[test]
fn test_oversized_program_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(
        dir.path(),
        &["--org", "org-1", "program", "create", "Endless", "--length-days", "4294967295"],
    );
    assert_ne!(code, 0);
    assert!(stderr.contains("lengthDays"));
}
