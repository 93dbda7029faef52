//! Push-tier security scanning over the branch diff.

use std::fs;

use crate::{
    assert_allow, assert_deny, bash_hook, commit_file, run_hook_in_dir, setup_branch_repo,
};

#[test]
fn test_committed_debug_line_denies_push() {
    let dir = setup_branch_repo();
    commit_file(
        dir.path(),
        "src/app.ts",
        "export function run() {\n  console.log(\"debug\");\n}\n",
    );

    let input = bash_hook("git push", dir.path().to_str().unwrap());
    let (exit_code, output) = run_hook_in_dir(dir.path(), &input);

    assert_deny(exit_code, &output);
    assert!(output.contains("console.log"), "reason should name the match: {output}");
    assert!(output.contains("src/app.ts"), "reason should name the file: {output}");
}

#[test]
fn test_clean_branch_allows_push() {
    let dir = setup_branch_repo();
    commit_file(
        dir.path(),
        "src/app.ts",
        "export function run() {\n  return 1;\n}\n",
    );

    let input = bash_hook("git push origin feature", dir.path().to_str().unwrap());
    let (exit_code, output) = run_hook_in_dir(dir.path(), &input);

    assert_allow(exit_code, &output);
    assert!(output.contains("security passed"), "output: {output}");
}

#[test]
fn test_suppression_marker_allows_push() {
    let dir = setup_branch_repo();
    commit_file(
        dir.path(),
        "src/app.ts",
        "console.log(\"intentional\"); // gatecheck:allow\n",
    );

    let input = bash_hook("git push", dir.path().to_str().unwrap());
    let (exit_code, output) = run_hook_in_dir(dir.path(), &input);

    assert_allow(exit_code, &output);
}

#[test]
fn test_skip_file_excludes_only_listed_paths() {
    // A debug line in a skipped directory is ignored; one outside is not.
    let dir = setup_branch_repo();
    fs::create_dir_all(dir.path().join(".gatecheck")).unwrap();
    fs::write(dir.path().join(".gatecheck/skip"), "# generated code\ngenerated/\n").unwrap();
    commit_file(dir.path(), "generated/foo.ts", "console.log(\"generated\");\n");
    commit_file(dir.path(), "src/bar.ts", "console.log(\"handwritten\");\n");

    let input = bash_hook("git push", dir.path().to_str().unwrap());
    let (exit_code, output) = run_hook_in_dir(dir.path(), &input);

    assert_deny(exit_code, &output);
    assert!(output.contains("src/bar.ts"), "output: {output}");
    assert!(!output.contains("generated/foo.ts"), "output: {output}");
}

#[test]
fn test_debug_line_in_test_file_allowed() {
    // Test files are excluded from source-debug checks.
    let dir = setup_branch_repo();
    commit_file(dir.path(), "src/app.test.ts", "console.log(\"test debug\");\n");

    let input = bash_hook("git push", dir.path().to_str().unwrap());
    let (exit_code, output) = run_hook_in_dir(dir.path(), &input);

    assert_allow(exit_code, &output);
}

#[test]
fn test_focused_test_denies_push_despite_skip_file() {
    // The focused-test category ignores the exclude list by design: a
    // skipped path can still silently disable sibling tests.
    let dir = setup_branch_repo();
    fs::create_dir_all(dir.path().join(".gatecheck")).unwrap();
    fs::write(dir.path().join(".gatecheck/skip"), "src/\n").unwrap();
    commit_file(
        dir.path(),
        "src/app.test.ts",
        "it.only('runs alone', () => {});\n",
    );

    let input = bash_hook("git push", dir.path().to_str().unwrap());
    let (exit_code, output) = run_hook_in_dir(dir.path(), &input);

    assert_deny(exit_code, &output);
    assert!(output.contains("focused test"), "output: {output}");
}

#[test]
fn test_preexisting_debug_line_not_flagged() {
    // Only lines added by this branch count; context lines never do.
    let dir = setup_branch_repo();
    // The debug line predates the branch point.
    commit_file(dir.path(), "src/legacy.ts", "console.log(\"old\");\n");
    let sha = crate::git(dir.path(), &["rev-parse", "HEAD"]);
    crate::git(dir.path(), &["update-ref", "refs/remotes/origin/main", &sha]);
    // The branch only adds a clean file.
    commit_file(dir.path(), "src/clean.ts", "export const x = 1;\n");

    let input = bash_hook("git push", dir.path().to_str().unwrap());
    let (exit_code, output) = run_hook_in_dir(dir.path(), &input);

    assert_allow(exit_code, &output);
}
