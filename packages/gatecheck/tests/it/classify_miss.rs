//! Untracked commands get silence: no output, exit 0.

use crate::{assert_silent, bash_hook, run_hook_in_dir, setup_repo};

#[test]
fn test_unrelated_command_is_silent() {
    let dir = setup_repo();
    let input = bash_hook("ls -la", dir.path().to_str().unwrap());
    let (exit_code, output) = run_hook_in_dir(dir.path(), &input);
    assert_silent(exit_code, &output);
}

#[test]
fn test_untracked_git_subcommand_is_silent() {
    let dir = setup_repo();
    let input = bash_hook("git status", dir.path().to_str().unwrap());
    let (exit_code, output) = run_hook_in_dir(dir.path(), &input);
    assert_silent(exit_code, &output);
}

#[test]
fn test_keyword_in_path_is_silent() {
    let dir = setup_repo();
    let input = bash_hook("git -C /tmp/commit status", dir.path().to_str().unwrap());
    let (exit_code, output) = run_hook_in_dir(dir.path(), &input);
    assert_silent(exit_code, &output);
}

#[test]
fn test_non_bash_tool_is_silent() {
    let dir = setup_repo();
    let input = serde_json::json!({
        "hook_event_name": "PreToolUse",
        "tool_name": "Write",
        "cwd": dir.path().to_str().unwrap(),
        "tool_input": {"file_path": "x", "content": "git commit"}
    })
    .to_string();
    let (exit_code, output) = run_hook_in_dir(dir.path(), &input);
    assert_silent(exit_code, &output);
}

#[test]
fn test_malformed_input_is_silent() {
    let dir = setup_repo();
    let (exit_code, output) = run_hook_in_dir(dir.path(), "this is not json {");
    assert_silent(exit_code, &output);
}

#[test]
fn test_empty_input_is_silent() {
    let dir = setup_repo();
    let (exit_code, output) = run_hook_in_dir(dir.path(), "");
    assert_silent(exit_code, &output);
}
