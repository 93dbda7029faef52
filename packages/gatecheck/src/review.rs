//! Advisory PR review status for merge events.
//!
//! This check never affects the decision: a merge is always allowed, and
//! the review state (or the reason it could not be fetched) rides along in
//! the machine-readable context. The `gh` invocations run under a bounded
//! wait so a hung network call cannot stall the hook indefinitely.

use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::git;

/// Upper bound for each `gh` invocation. Generous: exceeding it means the
/// advisory step is skipped, not failed.
const GH_TIMEOUT: Duration = Duration::from_secs(20);

/// Outcome of the advisory review fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewAdvisory {
    /// Review state fetched, e.g. `APPROVED` or `CHANGES_REQUESTED`.
    Status { pr: String, decision: String },

    /// The step could not complete; the reason is informational only.
    Skipped { reason: String },
}

impl ReviewAdvisory {
    /// Render for the response context.
    pub fn render(&self) -> String {
        match self {
            ReviewAdvisory::Status { pr, decision } => {
                format!("review status for PR #{pr}: {decision}")
            }
            ReviewAdvisory::Skipped { reason } => {
                format!("review status unavailable ({reason}); merge not blocked")
            }
        }
    }
}

/// Fetch the review decision for the PR being merged.
///
/// The PR number comes from the command when given (`gh pr merge 42`),
/// else from the open PR for the current branch.
pub fn advisory(dir: &Path, pr_number: Option<&str>) -> ReviewAdvisory {
    let pr = match pr_number {
        Some(pr) => pr.to_string(),
        None => match branch_pr(dir) {
            Some(pr) => pr,
            None => {
                return ReviewAdvisory::Skipped {
                    reason: "no open PR found for this branch".to_string(),
                };
            }
        },
    };

    let Some(output) = run_bounded(dir, &["pr", "view", &pr, "--json", "reviewDecision"]) else {
        return ReviewAdvisory::Skipped {
            reason: "gh unavailable or timed out".to_string(),
        };
    };

    let decision = serde_json::from_str::<Value>(&output)
        .ok()
        .and_then(|v| v.get("reviewDecision").and_then(Value::as_str).map(str::to_string))
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| "REVIEW_REQUIRED".to_string());

    ReviewAdvisory::Status { pr, decision }
}

/// The open PR number for the current branch, if exactly resolvable.
fn branch_pr(dir: &Path) -> Option<String> {
    let branch = git::current_branch(dir)?;
    let output = run_bounded(dir, &["pr", "list", "--head", &branch, "--json", "number"])?;

    serde_json::from_str::<Value>(&output)
        .ok()?
        .as_array()?
        .first()?
        .get("number")
        .map(Value::to_string)
}

/// Run `gh` with a bounded wait, returning stdout on in-time success.
fn run_bounded(dir: &Path, args: &[&str]) -> Option<String> {
    let child = Command::new("gh")
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .ok()?;

    let output = wait_bounded(child, GH_TIMEOUT)?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout).ok()
}

/// Poll a child process until it exits or the deadline passes; on timeout
/// the child is killed and `None` returned.
fn wait_bounded(mut child: Child, timeout: Duration) -> Option<std::process::Output> {
    let deadline = Instant::now() + timeout;

    loop {
        match child.try_wait() {
            Ok(Some(_)) => return child.wait_with_output().ok(),
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    tracing::warn!(?timeout, "gh exceeded advisory timeout");
                    return None;
                }
                std::thread::sleep(Duration::from_millis(50));
            }
            Err(error) => {
                tracing::warn!(%error, "waiting on gh");
                return None;
            }
        }
    }
}
