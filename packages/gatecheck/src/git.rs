//! Git state queries via shell commands.
//!
//! Every function takes the target directory explicitly and returns
//! `Option`: a missing repository, a failed invocation, or unparseable
//! output all degrade to `None` so callers can fall back conservatively
//! instead of erroring.

use std::path::Path;
use std::process::Command;

/// One entry of a `--name-status` diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub status: ChangeStatus,
    pub path: String,
}

/// Git diff status letters gatecheck distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
    Copied,
    Other,
}

impl ChangeStatus {
    fn parse(letter: char) -> Self {
        match letter {
            'A' => Self::Added,
            'M' => Self::Modified,
            'D' => Self::Deleted,
            'R' => Self::Renamed,
            'C' => Self::Copied,
            _ => Self::Other,
        }
    }
}

/// Run git in `dir` and return trimmed stdout on success.
fn git(dir: &Path, args: &[&str]) -> Option<String> {
    let dir_str = dir.to_str()?;

    let output = Command::new("git")
        .args(["-C", dir_str])
        .args(args)
        .output()
        .ok()?;

    if !output.status.success() {
        tracing::debug!(?args, status = ?output.status, "git invocation failed");
        return None;
    }

    String::from_utf8(output.stdout)
        .ok()
        .map(|s| s.trim_end().to_string())
}

/// Get the current branch name.
///
/// Returns `None` if not in a git repository, the command fails, or HEAD
/// is detached.
pub fn current_branch(dir: &Path) -> Option<String> {
    git(dir, &["branch", "--show-current"])
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Files currently staged (index vs HEAD).
pub fn staged_changes(dir: &Path) -> Option<Vec<FileChange>> {
    git(dir, &["diff", "--cached", "--name-status"]).map(|out| parse_name_status(&out))
}

/// Files changed on this branch relative to `base`'s merge base.
pub fn branch_changes(dir: &Path, base: &str) -> Option<Vec<FileChange>> {
    let range = format!("{base}...HEAD");
    git(dir, &["diff", "--name-status", &range]).map(|out| parse_name_status(&out))
}

/// All tracked files, used as the whole-repository fallback scope.
pub fn tracked_files(dir: &Path) -> Option<Vec<String>> {
    git(dir, &["ls-files"]).map(|out| out.lines().map(str::to_string).collect())
}

/// Resolve the diff base for branch-scoped events.
///
/// Fallback chain: the configured upstream tracking ref, then the
/// conventional default-branch remote refs. `None` means the caller must
/// treat the scope as the whole repository rather than fail.
pub fn diff_base(dir: &Path) -> Option<String> {
    if let Some(upstream) = git(
        dir,
        &["rev-parse", "--abbrev-ref", "--symbolic-full-name", "@{upstream}"],
    )
    .filter(|s| !s.is_empty())
    {
        return Some(upstream);
    }

    for candidate in ["origin/main", "origin/master"] {
        let commit = format!("{candidate}^{{commit}}");
        if git(dir, &["rev-parse", "--verify", "--quiet", &commit]).is_some() {
            return Some(candidate.to_string());
        }
    }

    None
}

/// Added lines of one file, as `(new line number, content)` pairs.
///
/// `base` of `None` means the staged diff (index vs HEAD); `Some` means
/// the branch diff against that base's merge base. Context and removed
/// lines are never returned.
pub fn added_lines(dir: &Path, base: Option<&str>, path: &str) -> Option<Vec<(u32, String)>> {
    let output = match base {
        None => git(dir, &["diff", "--cached", "--unified=0", "--", path])?,
        Some(base) => {
            let range = format!("{base}...HEAD");
            git(dir, &["diff", "--unified=0", &range, "--", path])?
        }
    };
    Some(parse_added_lines(&output))
}

/// Content of `path` at revision `rev`, e.g. the base manifest for the
/// dependency-audit delta.
pub fn show_file(dir: &Path, rev: &str, path: &str) -> Option<String> {
    git(dir, &["show", &format!("{rev}:{path}")])
}

fn parse_name_status(output: &str) -> Vec<FileChange> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split('\t');
            let status_field = fields.next()?.trim();
            let status = ChangeStatus::parse(status_field.chars().next()?);
            // Renames and copies list the new path last.
            let path = fields.next_back()?.trim();
            if path.is_empty() {
                return None;
            }
            Some(FileChange {
                status,
                path: path.to_string(),
            })
        })
        .collect()
}

fn parse_added_lines(diff: &str) -> Vec<(u32, String)> {
    let mut lines = Vec::new();
    let mut line_no: u32 = 0;

    for line in diff.lines() {
        if let Some(header) = line.strip_prefix("@@") {
            // `@@ -a,b +c,d @@` — the new-file start is the `+c` field.
            line_no = header
                .split_whitespace()
                .find_map(|field| field.strip_prefix('+'))
                .and_then(|start| start.split(',').next())
                .and_then(|start| start.parse().ok())
                .unwrap_or(0);
        } else if let Some(added) = line.strip_prefix('+') {
            if !line.starts_with("+++") {
                lines.push((line_no, added.to_string()));
                line_no += 1;
            }
        } else if line.starts_with(' ') {
            line_no += 1;
        }
    }
    lines
}
