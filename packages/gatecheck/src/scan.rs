//! Security and lint pattern scanning over changed lines.
//!
//! The engine only ever flags lines introduced by the current change:
//! diff-based scopes scan added lines, and only the whole-repository
//! fallback scope scans full file contents. Findings pass through the
//! scope's compiled exclude list before being returned, except for the
//! focused-test category, which deliberately sees test files.

use std::path::Path;
use std::sync::LazyLock;

use derive_more::Display;
use regex::Regex;

use crate::audit;
use crate::classify::EventKind;
use crate::config;
use crate::detect::ProjectDescriptor;
use crate::git::{self, ChangeStatus};
use crate::scope::{ChangeScope, ScopeKind};

/// Cap on a single finding's snippet, protecting downstream serialization
/// from pathological minified or vendored content.
const SNIPPET_CAP: usize = 200;

/// Inline marker that suppresses a debug finding on its line (or the
/// immediately preceding added line).
pub const SUPPRESS_MARKER: &str = "gatecheck:allow";

/// How deep the security phase scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    /// Debug artifacts and focused tests (push tier).
    Standard,

    /// Standard plus dotenv files, secret-shaped literals, and the
    /// dependency audit (pr-create tier).
    Expanded,
}

impl Depth {
    pub fn for_event(kind: EventKind) -> Self {
        match kind {
            EventKind::PrCreate | EventKind::PrMerge => Depth::Expanded,
            _ => Depth::Standard,
        }
    }
}

/// One problem found in the change set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub file: String,
    pub line: Option<u32>,
    pub category: Category,
    pub snippet: String,
}

impl Finding {
    fn new(file: &str, line: impl Into<Option<u32>>, category: Category, snippet: &str) -> Self {
        Finding {
            file: file.to_string(),
            line: line.into(),
            category,
            snippet: clip(snippet),
        }
    }

    /// Render as a single report line.
    pub fn render(&self) -> String {
        match self.line {
            Some(line) => format!("{}:{}: {}: {}", self.file, line, self.category, self.snippet),
            None => format!("{}: {}: {}", self.file, self.category, self.snippet),
        }
    }
}

/// Finding categories, rendered into deny reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Category {
    #[display("debug statement")]
    DebugPrint,

    #[display("debugger statement")]
    Debugger,

    #[display("focused test")]
    FocusedTest,

    #[display(".env file introduced in branch changes")]
    DotenvFile,

    #[display("possible hardcoded secret")]
    Secret,

    #[display("vulnerable dependency")]
    VulnerableDependency,
}

static JS_DEBUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bconsole\.(log|debug|trace)\s*\(").unwrap());
static JS_DEBUGGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bdebugger\b").unwrap());
static GO_DEBUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bfmt\.Print(ln|f)?\s*\(").unwrap());
static PY_DEBUG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*print\s*\(").unwrap());
static PY_DEBUGGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bbreakpoint\s*\(\s*\)|\bpdb\.set_trace\s*\(").unwrap());
static RUST_DEBUG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bdbg!\s*\(").unwrap());
static JS_FOCUSED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(it|test|describe|context)\.only\s*\(|\b(fit|fdescribe|fcontext)\s*\(").unwrap()
});
static GO_FOCUSED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bFocusConvey\s*\(").unwrap());
static SECRET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)\b(api[_-]?key|access[_-]?key|auth[_-]?token|token|secret|password|passwd|private[_-]?key)\b\s*[:=]\s*["'][^"']{8,}"#,
    )
    .unwrap()
});

/// Scan the change scope at the given depth.
///
/// The descriptor is needed by the expanded-depth dependency audit; the
/// standard depth ignores it.
pub fn scan(
    dir: &Path,
    scope: &ChangeScope,
    depth: Depth,
    descriptor: &ProjectDescriptor,
) -> Vec<Finding> {
    let mut findings = Vec::new();

    for change in &scope.files {
        if change.status == ChangeStatus::Deleted {
            continue;
        }

        let lines = changed_lines(dir, scope, &change.path);

        if !scope.excludes.excluded_for_debug(&change.path) {
            findings.extend(debug_findings(&change.path, &lines));
        }
        if is_test_file(&change.path) {
            findings.extend(focused_findings(&change.path, &lines));
        }

        if depth == Depth::Expanded {
            if change.status == ChangeStatus::Added && is_dotenv(&change.path) {
                findings.push(Finding::new(
                    &change.path,
                    None,
                    Category::DotenvFile,
                    "credential-shaped file",
                ));
            }
            findings.extend(secret_findings(&change.path, &lines));
        }
    }

    if depth == Depth::Expanded {
        let allowlist = config::audit_allowlist(dir);
        findings.extend(audit::audit(dir, scope, descriptor, &allowlist));
    }

    // Final filtering pass: the compiled exclude list applies uniformly to
    // every category except focused tests.
    findings.retain(|f| {
        f.category == Category::FocusedTest || !scope.excludes.excluded(&f.file)
    });

    findings
}

/// The lines this change introduces in `path`.
///
/// Diff-based scopes ask git for added lines only; the whole-repository
/// fallback reads the file as it stands.
fn changed_lines(dir: &Path, scope: &ChangeScope, path: &str) -> Vec<(u32, String)> {
    match &scope.kind {
        ScopeKind::WholeRepo => std::fs::read_to_string(dir.join(path))
            .map(|content| {
                content
                    .lines()
                    .enumerate()
                    .map(|(i, line)| (i as u32 + 1, line.to_string()))
                    .collect()
            })
            .unwrap_or_default(),
        ScopeKind::Staged => git::added_lines(dir, None, path).unwrap_or_default(),
        ScopeKind::BranchDiff { base } => {
            git::added_lines(dir, Some(base), path).unwrap_or_default()
        }
    }
}

/// The debug pattern set for a file, chosen by extension.
fn debug_patterns(path: &str) -> Vec<(&'static Regex, Category)> {
    match extension(path) {
        "js" | "jsx" | "ts" | "tsx" | "mjs" | "cjs" => vec![
            (&*JS_DEBUG, Category::DebugPrint),
            (&*JS_DEBUGGER, Category::Debugger),
        ],
        "go" => vec![(&*GO_DEBUG, Category::DebugPrint)],
        "py" => vec![
            (&*PY_DEBUG, Category::DebugPrint),
            (&*PY_DEBUGGER, Category::Debugger),
        ],
        "rs" => vec![(&*RUST_DEBUG, Category::DebugPrint)],
        _ => Vec::new(),
    }
}

fn debug_findings(path: &str, lines: &[(u32, String)]) -> Vec<Finding> {
    let mut findings = Vec::new();
    let patterns = debug_patterns(path);
    if patterns.is_empty() {
        return findings;
    }

    for (i, (line_no, text)) in lines.iter().enumerate() {
        if suppressed(lines, i) {
            continue;
        }
        for (pattern, category) in &patterns {
            if pattern.is_match(text) {
                findings.push(Finding::new(path, *line_no, *category, text.trim()));
            }
        }
    }
    findings
}

fn focused_findings(path: &str, lines: &[(u32, String)]) -> Vec<Finding> {
    let pattern: &Regex = match extension(path) {
        "js" | "jsx" | "ts" | "tsx" | "mjs" | "cjs" => &*JS_FOCUSED,
        "go" => &*GO_FOCUSED,
        _ => return Vec::new(),
    };

    lines
        .iter()
        .filter(|(_, text)| pattern.is_match(text))
        .map(|(line_no, text)| Finding::new(path, *line_no, Category::FocusedTest, text.trim()))
        .collect()
}

fn secret_findings(path: &str, lines: &[(u32, String)]) -> Vec<Finding> {
    lines
        .iter()
        .filter(|(_, text)| SECRET.is_match(text))
        .map(|(line_no, text)| Finding::new(path, *line_no, Category::Secret, text.trim()))
        .collect()
}

/// An occurrence is suppressed by the marker on its own line or on the
/// immediately preceding added line.
fn suppressed(lines: &[(u32, String)], index: usize) -> bool {
    if lines[index].1.contains(SUPPRESS_MARKER) {
        return true;
    }
    index
        .checked_sub(1)
        .and_then(|prev| lines.get(prev))
        .is_some_and(|(prev_no, text)| {
            text.contains(SUPPRESS_MARKER) && prev_no + 1 == lines[index].0
        })
}

/// Test files and helpers, which the focused-test check targets.
pub fn is_test_file(path: &str) -> bool {
    let base = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path);

    base.ends_with("_test.go")
        || base.contains(".test.")
        || base.contains(".spec.")
        || base == "conftest.py"
        || (base.starts_with("test_") && base.ends_with(".py"))
        || path
            .split('/')
            .any(|c| matches!(c, "test" | "tests" | "__tests__"))
}

/// Dotenv-style filenames, minus the conventionally-committed templates.
fn is_dotenv(path: &str) -> bool {
    let base = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path);

    if base == ".env" {
        return true;
    }
    base.strip_prefix(".env.")
        .is_some_and(|suffix| !matches!(suffix, "example" | "sample" | "template"))
}

fn extension(path: &str) -> &str {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
}

fn clip(snippet: &str) -> String {
    if snippet.len() <= SNIPPET_CAP {
        return snippet.to_string();
    }
    let mut end = SNIPPET_CAP;
    while !snippet.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &snippet[..end])
}
