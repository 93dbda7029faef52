//! Per-tier opt-out markers.

use std::fs;

use crate::{assert_allow, assert_deny, bash_hook, commit_file, run_hook_in_dir, setup_branch_repo, setup_repo};

#[test]
fn test_pr_merge_marker_allows_immediately() {
    let dir = setup_repo();
    fs::create_dir_all(dir.path().join(".gatecheck")).unwrap();
    fs::write(dir.path().join(".gatecheck/off-pr-merge"), "").unwrap();

    let input = bash_hook("gh pr merge 42", dir.path().to_str().unwrap());
    let (exit_code, output) = run_hook_in_dir(dir.path(), &input);

    assert_allow(exit_code, &output);
    assert!(output.contains("disabled"), "output: {output}");
}

#[test]
fn test_pr_merge_without_marker_still_allows() {
    // The merge tier is advisory-only; the review status (or why it was
    // unavailable) rides along in the context.
    let dir = setup_repo();
    let input = bash_hook("gh pr merge 42", dir.path().to_str().unwrap());
    let (exit_code, output) = run_hook_in_dir(dir.path(), &input);

    assert_allow(exit_code, &output);
}

#[test]
fn test_push_marker_bypasses_security_scan() {
    let dir = setup_branch_repo();
    fs::create_dir_all(dir.path().join(".gatecheck")).unwrap();
    fs::write(dir.path().join(".gatecheck/off-push"), "").unwrap();
    commit_file(dir.path(), "src/app.ts", "console.log(\"debug\");\n");

    let input = bash_hook("git push", dir.path().to_str().unwrap());
    let (exit_code, output) = run_hook_in_dir(dir.path(), &input);

    assert_allow(exit_code, &output);
    assert!(output.contains("disabled"), "output: {output}");
}

#[test]
fn test_marker_is_tier_specific() {
    // An off-push marker must not disable the pr-create tier.
    let dir = setup_branch_repo();
    fs::create_dir_all(dir.path().join(".gatecheck")).unwrap();
    fs::write(dir.path().join(".gatecheck/off-push"), "").unwrap();
    commit_file(dir.path(), ".env", "API_KEY=supersecretvalue\n");

    let input = bash_hook("gh pr create", dir.path().to_str().unwrap());
    let (exit_code, output) = run_hook_in_dir(dir.path(), &input);

    assert_deny(exit_code, &output);
}
