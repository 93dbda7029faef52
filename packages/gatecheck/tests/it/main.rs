//! Integration tests for the verification hook pipeline.
//!
//! Each test sets up a throwaway git repository, feeds a PreToolUse hook
//! payload to the real binary over stdin, and asserts on the structured
//! response: silence for untracked commands, `allow` with context only,
//! or `deny` with both reason and context.

mod classify_miss;
mod cli;
mod optout;
mod pr_create;
mod push_tier;

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use pretty_assertions::assert_eq as pretty_assert_eq;
use tempfile::TempDir;

/// Build a PreToolUse hook JSON payload for the Bash tool.
pub fn bash_hook(command: &str, cwd: &str) -> String {
    serde_json::json!({
        "hook_event_name": "PreToolUse",
        "session_id": "test",
        "transcript_path": "/tmp/test",
        "permission_mode": "default",
        "cwd": cwd,
        "tool_name": "Bash",
        "tool_use_id": "123",
        "tool_input": {
            "command": command,
            "description": "Test command"
        }
    })
    .to_string()
}

/// Get the path to the built gatecheck binary.
pub fn binary_path() -> PathBuf {
    let status = Command::new("cargo")
        .args(["build", "--quiet", "-p", "gatecheck"])
        .status()
        .expect("failed to build gatecheck");
    assert!(status.success(), "cargo build failed");

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let workspace_root = manifest_dir.parent().unwrap().parent().unwrap();
    workspace_root.join("target/debug/gatecheck")
}

/// Run `gatecheck hook` with the given input JSON in the given directory,
/// returning (exit code, stdout).
pub fn run_hook_in_dir(dir: &Path, input: &str) -> (i32, String) {
    let mut child = Command::new(binary_path())
        .arg("hook")
        .current_dir(dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn gatecheck");

    {
        let stdin = child.stdin.as_mut().expect("failed to get stdin");
        stdin
            .write_all(input.as_bytes())
            .expect("failed to write to stdin");
    }

    let output = child.wait_with_output().expect("failed to wait for gatecheck");
    let exit_code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (exit_code, stdout)
}

/// Run a git command in the repo, asserting success.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Create a git repository on `main` with an initial commit.
pub fn setup_repo() -> TempDir {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path();

    git(path, &["init", "-b", "main"]);
    git(path, &["config", "user.email", "test@test.com"]);
    git(path, &["config", "user.name", "Test"]);

    fs::write(path.join("README.md"), "# Test\n").expect("write readme");
    git(path, &["add", "."]);
    git(path, &["commit", "-m", "Initial commit"]);

    dir
}

/// A repo on a `feature` branch whose base (`origin/main`) is resolvable,
/// so push/pr events get a proper branch diff.
pub fn setup_branch_repo() -> TempDir {
    let dir = setup_repo();
    let path = dir.path();

    let main_sha = git(path, &["rev-parse", "HEAD"]);
    git(path, &["update-ref", "refs/remotes/origin/main", &main_sha]);
    git(path, &["checkout", "-b", "feature"]);

    dir
}

/// Write a file (creating parent directories) and commit it.
pub fn commit_file(dir: &Path, relative: &str, content: &str) {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dirs");
    }
    fs::write(&path, content).expect("write file");
    git(dir, &["add", "."]);
    git(dir, &["commit", "-m", &format!("add {relative}")]);
}

pub fn assert_silent(exit_code: i32, output: &str) {
    pretty_assert_eq!(exit_code, 0, "expected exit 0, output: {output}");
    assert!(output.is_empty(), "expected no output, got: {output}");
}

pub fn assert_allow(exit_code: i32, output: &str) {
    pretty_assert_eq!(exit_code, 0, "expected exit 0, output: {output}");
    assert!(
        output.contains(r#""permissionDecision":"allow""#),
        "expected allow decision, got: {output}"
    );
    assert!(
        !output.contains("permissionDecisionReason"),
        "allow must not carry a reason field: {output}"
    );
    assert!(
        output.contains("additionalContext"),
        "allow must carry context: {output}"
    );
}

pub fn assert_deny(exit_code: i32, output: &str) {
    pretty_assert_eq!(exit_code, 0, "expected exit 0, output: {output}");
    assert!(
        output.contains(r#""permissionDecision":"deny""#),
        "expected deny decision, got: {output}"
    );
    assert!(
        output.contains("permissionDecisionReason"),
        "deny must carry a reason field: {output}"
    );
    assert!(
        output.contains("additionalContext"),
        "deny must carry context: {output}"
    );
}
