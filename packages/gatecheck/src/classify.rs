//! Git lifecycle classification for shell commands.
//!
//! Classification is deliberately heuristic: a quote-aware scanner splits
//! the raw command at unquoted control operators, each segment is
//! word-split, and the token list is matched against the known `git`/`gh`
//! shapes. Matching anchors on whole tokens in command position, so a flag
//! value or message that merely contains the word "commit" can never fire.

use std::path::{Path, PathBuf};

use derive_more::Display;

/// A git lifecycle event extracted from a shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitEvent {
    pub kind: EventKind,

    /// The directory the event targets.
    pub dir: PathBuf,

    /// PR number for `gh pr merge <id>`, when one was given.
    pub pr_number: Option<String>,
}

/// The git lifecycle stages gatecheck tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum EventKind {
    #[display("commit")]
    Commit,

    #[display("push")]
    Push,

    #[display("pr-create")]
    PrCreate,

    #[display("pr-merge")]
    PrMerge,
}

/// Classify a shell command, returning `None` for anything gatecheck does
/// not track. `None` means the caller must exit silently with no output.
///
/// When a chain contains several lifecycle events (`git commit && git
/// push`), the last matching segment wins: the chain's terminal stage is
/// the one whose tier gates the invocation.
pub fn classify(command: &str, cwd: &Path) -> Option<GitEvent> {
    let mut event = None;
    for segment in segments(command) {
        // A segment that fails word splitting (unbalanced quotes) is
        // skipped rather than failing the whole classification.
        let Ok(tokens) = shell_words::split(&segment) else {
            continue;
        };
        if let Some(found) = classify_segment(&tokens, cwd) {
            event = Some(found);
        }
    }
    event
}

/// Split a raw command at unquoted control operators (`&&`, `||`, `|`,
/// `;`, newlines). Quoting state is tracked so operators inside string
/// literals never split.
fn segments(command: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = command.chars().peekable();
    let mut in_single = false;
    let mut in_double = false;

    while let Some(c) = chars.next() {
        match c {
            '\\' if !in_single => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '\'' if !in_double => {
                in_single = !in_single;
                current.push(c);
            }
            '"' if !in_single => {
                in_double = !in_double;
                current.push(c);
            }
            '&' | '|' if !in_single && !in_double => {
                // Consume the doubled form; a single `&` or `|` splits too.
                if chars.peek() == Some(&c) {
                    chars.next();
                }
                segments.push(std::mem::take(&mut current));
            }
            ';' | '\n' if !in_single && !in_double => {
                segments.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    segments.push(current);
    segments
}

fn classify_segment(tokens: &[String], cwd: &Path) -> Option<GitEvent> {
    let (program, args) = tokens.split_first()?;
    match program.as_str() {
        "git" => classify_git(args, cwd),
        "gh" => classify_gh(args, cwd),
        _ => None,
    }
}

/// Match `git [globals] commit|push`, consuming global flag values so they
/// can never be mistaken for a subcommand.
fn classify_git(args: &[String], cwd: &Path) -> Option<GitEvent> {
    let mut dir: Option<PathBuf> = None;
    let mut i = 0;

    while i < args.len() {
        let arg = args[i].as_str();
        match arg {
            "-C" => {
                dir = args.get(i + 1).map(PathBuf::from);
                i += 2;
            }
            // Global flags that take a separate value.
            "-c" | "--git-dir" | "--work-tree" | "--namespace" | "--exec-path" => i += 2,
            flag if flag.starts_with('-') => i += 1,
            subcommand => {
                let kind = match subcommand {
                    "commit" => EventKind::Commit,
                    "push" => EventKind::Push,
                    _ => return None,
                };
                return Some(GitEvent {
                    kind,
                    dir: resolve_dir(dir, cwd),
                    pr_number: None,
                });
            }
        }
    }
    None
}

/// Match `gh pr create` and `gh pr merge [<id>]`.
fn classify_gh(args: &[String], cwd: &Path) -> Option<GitEvent> {
    let mut words = args.iter().filter(|a| !a.starts_with('-'));
    if words.next().map(String::as_str) != Some("pr") {
        return None;
    }

    match words.next().map(String::as_str) {
        Some("create") => Some(GitEvent {
            kind: EventKind::PrCreate,
            dir: cwd.to_path_buf(),
            pr_number: None,
        }),
        Some("merge") => Some(GitEvent {
            kind: EventKind::PrMerge,
            dir: cwd.to_path_buf(),
            pr_number: words.next().cloned(),
        }),
        _ => None,
    }
}

fn resolve_dir(dir: Option<PathBuf>, cwd: &Path) -> PathBuf {
    match dir {
        Some(dir) if dir.is_absolute() => dir,
        Some(dir) => cwd.join(dir),
        None => cwd.to_path_buf(),
    }
}
