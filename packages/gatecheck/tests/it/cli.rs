//! CLI surface: `detect` and `check` subcommands.

use std::fs;
use std::process::Command;

use pretty_assertions::assert_eq as pretty_assert_eq;

use crate::{binary_path, git, setup_repo};

fn run_gatecheck(dir: &std::path::Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(binary_path())
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run gatecheck");

    (
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
    )
}

#[test]
fn test_detect_prints_descriptor_json() {
    let dir = setup_repo();
    fs::write(dir.path().join("go.mod"), "module example.com/app\n").unwrap();

    let (exit_code, stdout, stderr) = run_gatecheck(dir.path(), &["detect", "."]);
    pretty_assert_eq!(exit_code, 0, "stderr: {stderr}");

    let descriptor: serde_json::Value = serde_json::from_str(&stdout).expect("valid json");
    pretty_assert_eq!(descriptor["ecosystem"], "go");
    pretty_assert_eq!(descriptor["typecheck"], serde_json::Value::Null);
    pretty_assert_eq!(descriptor["build"], "go build ./...");
}

#[test]
fn test_check_commit_tier_unknown_ecosystem_passes() {
    let dir = setup_repo();
    fs::write(dir.path().join("data.xyz"), "x").unwrap();
    git(dir.path(), &["add", "."]);

    let (exit_code, stdout, stderr) = run_gatecheck(dir.path(), &["check", "--event", "commit", "."]);
    pretty_assert_eq!(exit_code, 0, "stdout: {stdout}\nstderr: {stderr}");
    assert!(stdout.contains("skipped"), "stdout: {stdout}");
}

#[test]
fn test_check_docs_only_reports_skip() {
    let dir = setup_repo();
    fs::write(dir.path().join("README.md"), "# Test v2\n").unwrap();
    git(dir.path(), &["add", "."]);

    let (exit_code, stdout, _) = run_gatecheck(dir.path(), &["check", "--event", "commit", "."]);
    pretty_assert_eq!(exit_code, 0);
    assert!(stdout.contains("documentation-only"), "stdout: {stdout}");
}

#[test]
fn test_check_rejects_unknown_event() {
    let dir = setup_repo();
    let (exit_code, _, stderr) = run_gatecheck(dir.path(), &["check", "--event", "rebase", "."]);
    assert!(exit_code != 0);
    assert!(stderr.contains("unknown event"), "stderr: {stderr}");
}

#[test]
fn test_version_flag() {
    let dir = setup_repo();
    let (exit_code, stdout, _) = run_gatecheck(dir.path(), &["--version"]);
    pretty_assert_eq!(exit_code, 0);
    assert!(!stdout.trim().is_empty());
}
