//! PR-creation tier: expanded security depth, then tests.

use std::fs;

use crate::{
    assert_allow, assert_deny, bash_hook, commit_file, run_hook_in_dir, setup_branch_repo,
};

#[test]
fn test_dotenv_file_denies_pr_create() {
    let dir = setup_branch_repo();
    commit_file(dir.path(), ".env", "API_KEY=supersecretvalue\n");

    let input = bash_hook("gh pr create --title x --body y", dir.path().to_str().unwrap());
    let (exit_code, output) = run_hook_in_dir(dir.path(), &input);

    assert_deny(exit_code, &output);
    assert!(
        output.contains(".env file introduced in branch changes"),
        "finding should list the .env path: {output}"
    );
}

#[test]
fn test_dotenv_example_allowed() {
    let dir = setup_branch_repo();
    commit_file(dir.path(), ".env.example", "API_KEY=\n");

    let input = bash_hook("gh pr create", dir.path().to_str().unwrap());
    let (exit_code, output) = run_hook_in_dir(dir.path(), &input);

    assert_allow(exit_code, &output);
}

#[test]
fn test_secret_literal_denies_pr_create() {
    let dir = setup_branch_repo();
    commit_file(
        dir.path(),
        "src/config.ts",
        "export const apiKey = \"sk-1234567890abcdef\";\n",
    );

    let input = bash_hook("gh pr create", dir.path().to_str().unwrap());
    let (exit_code, output) = run_hook_in_dir(dir.path(), &input);

    assert_deny(exit_code, &output);
    assert!(output.contains("possible hardcoded secret"), "output: {output}");
}

#[test]
fn test_secret_literal_allowed_at_push_depth() {
    // Secret detection is expanded-depth only; the push tier scans for
    // debug artifacts, not literals.
    let dir = setup_branch_repo();
    commit_file(
        dir.path(),
        "src/config.ts",
        "export const apiKey = \"sk-1234567890abcdef\";\n",
    );

    let input = bash_hook("git push", dir.path().to_str().unwrap());
    let (exit_code, output) = run_hook_in_dir(dir.path(), &input);

    assert_allow(exit_code, &output);
}

#[test]
fn test_docs_only_branch_short_circuits_pr_create() {
    let dir = setup_branch_repo();
    commit_file(dir.path(), "docs/guide.md", "# Guide\n");

    let input = bash_hook("gh pr create", dir.path().to_str().unwrap());
    let (exit_code, output) = run_hook_in_dir(dir.path(), &input);

    assert_allow(exit_code, &output);
    assert!(
        output.contains("documentation-only"),
        "expected docs-only exemption with zero phases run: {output}"
    );
}

#[test]
fn test_security_failure_reports_before_tests_run() {
    // Security precedes test in the tier order; the deny must come from
    // the security phase.
    let dir = setup_branch_repo();
    fs::create_dir_all(dir.path().join(".gatecheck")).unwrap();
    commit_file(dir.path(), ".env", "TOKEN=abcdef123456\n");

    let input = bash_hook("gh pr create", dir.path().to_str().unwrap());
    let (exit_code, output) = run_hook_in_dir(dir.path(), &input);

    assert_deny(exit_code, &output);
    assert!(output.contains("security failed"), "output: {output}");
}
