//! Change-scope resolution: which files and lines the current event is
//! about, which of them are excluded, and whether the whole change is
//! documentation-only.

use std::path::Path;

use glob::Pattern;

use crate::classify::EventKind;
use crate::config;
use crate::git::{self, ChangeStatus, FileChange};

/// What the file list was diffed against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeKind {
    /// Index vs HEAD (commit events).
    Staged,

    /// This branch vs its merge base.
    BranchDiff { base: String },

    /// Base could not be determined; every tracked file is in scope.
    /// Checking more than strictly necessary beats silently skipping.
    WholeRepo,
}

/// The set of files relevant to the current check, with its exclusions.
#[derive(Debug, Clone)]
pub struct ChangeScope {
    pub kind: ScopeKind,
    pub files: Vec<FileChange>,
    pub excludes: ExcludeList,
}

/// Extensions that qualify a file as documentation-only.
///
/// Structured-data formats (YAML, JSON, TOML) are deliberately absent:
/// they are text, but they can alter build and test behavior.
const DOCS_EXTENSIONS: &[&str] = &[
    "md", "markdown", "mdx", "txt", "png", "jpg", "jpeg", "gif", "svg", "webp", "ico",
];

/// Built-in vendor/dependency/build-output exclusions.
const VENDOR_PATTERNS: &[&str] = &[
    "node_modules",
    "vendor",
    "dist",
    "target",
    "coverage",
    ".next",
    "*.min.js",
    "*.min.css",
];

/// Test files and test-helper scripts, excluded from source-debug checks
/// only. Focused-test detection intentionally still sees these.
const TEST_PATTERNS: &[&str] = &[
    "*_test.go",
    "*.test.js",
    "*.test.jsx",
    "*.test.ts",
    "*.test.tsx",
    "*.spec.js",
    "*.spec.ts",
    "test",
    "tests",
    "__tests__",
    "testdata",
    "conftest.py",
    "test_*.py",
];

/// CLI entry points: declared executables plus Go's conventional ones.
const ENTRYPOINT_PATTERNS: &[&str] = &["main.go", "cmd"];

impl ChangeScope {
    /// Resolve the scope for an event in `dir`.
    ///
    /// Commit events use the staged diff; everything else diffs the branch
    /// against the resolved base, degrading to the whole repository when
    /// no base can be determined. Git failures degrade to an empty file
    /// list rather than erroring.
    pub fn resolve(dir: &Path, kind: EventKind) -> Self {
        let excludes = ExcludeList::compile(dir);

        match kind {
            EventKind::Commit => ChangeScope {
                kind: ScopeKind::Staged,
                files: git::staged_changes(dir).unwrap_or_default(),
                excludes,
            },
            _ => match git::diff_base(dir) {
                Some(base) => ChangeScope {
                    files: git::branch_changes(dir, &base).unwrap_or_default(),
                    kind: ScopeKind::BranchDiff { base },
                    excludes,
                },
                None => ChangeScope {
                    kind: ScopeKind::WholeRepo,
                    files: git::tracked_files(dir)
                        .unwrap_or_default()
                        .into_iter()
                        .map(|path| FileChange {
                            status: ChangeStatus::Modified,
                            path,
                        })
                        .collect(),
                    excludes,
                },
            },
        }
    }

    /// The diff base to hand to [`git::added_lines`], if this scope is
    /// diff-based.
    pub fn diff_base(&self) -> Option<&str> {
        match &self.kind {
            ScopeKind::BranchDiff { base } => Some(base),
            _ => None,
        }
    }

    /// Whether the change set qualifies for the docs-only exemption.
    ///
    /// True only when every file is added or modified (deletions and
    /// renames can break references elsewhere) and every path has a
    /// documentation extension. Empty and whole-repository scopes never
    /// qualify: an ambiguous state runs full verification.
    pub fn docs_only(&self) -> bool {
        if self.files.is_empty() || self.kind == ScopeKind::WholeRepo {
            return false;
        }

        self.files.iter().all(|f| {
            matches!(f.status, ChangeStatus::Added | ChangeStatus::Modified) && is_docs_file(&f.path)
        })
    }
}

fn is_docs_file(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            DOCS_EXTENSIONS.contains(&ext.as_str())
        })
}

/// The compiled exclusion set for one invocation.
///
/// The general set is a union of built-in vendor patterns, declared CLI
/// entry points, and user skip globs; a file matching any one of them is
/// excluded uniformly from debug and secret findings. The test-file set
/// applies to source-debug checks only.
#[derive(Debug, Clone)]
pub struct ExcludeList {
    general: Vec<Pattern>,
    tests: Vec<Pattern>,
}

impl ExcludeList {
    /// Compile the union for `dir`: built-ins, manifest `bin` entries,
    /// then `.gatecheck/skip` globs. Later entries never override earlier
    /// ones; the sets only grow.
    pub fn compile(dir: &Path) -> Self {
        let mut general = Vec::new();

        for raw in VENDOR_PATTERNS
            .iter()
            .chain(ENTRYPOINT_PATTERNS)
            .map(|p| p.to_string())
            .chain(manifest_bin_entries(dir))
            .chain(config::skip_patterns(dir))
        {
            let raw = raw.trim_end_matches('/');
            match Pattern::new(raw) {
                Ok(pattern) => general.push(pattern),
                Err(error) => tracing::warn!(%raw, %error, "ignoring invalid skip pattern"),
            }
        }

        let tests = TEST_PATTERNS
            .iter()
            .filter_map(|p| Pattern::new(p).ok())
            .collect();

        ExcludeList { general, tests }
    }

    /// Built-ins plus the given skip patterns, no filesystem reads.
    #[cfg(test)]
    pub fn from_patterns(patterns: &[&str]) -> Self {
        ExcludeList {
            general: VENDOR_PATTERNS
                .iter()
                .chain(ENTRYPOINT_PATTERNS)
                .chain(patterns)
                .map(|p| Pattern::new(p.trim_end_matches('/')).unwrap())
                .collect(),
            tests: TEST_PATTERNS
                .iter()
                .filter_map(|p| Pattern::new(p).ok())
                .collect(),
        }
    }

    /// Whether `path` is excluded from debug and secret findings.
    pub fn excluded(&self, path: &str) -> bool {
        self.general.iter().any(|p| hits(p, path))
    }

    /// Whether `path` is excluded from source-debug checks specifically:
    /// the general union plus test files and helpers.
    pub fn excluded_for_debug(&self, path: &str) -> bool {
        self.excluded(path) || self.tests.iter().any(|p| hits(p, path))
    }
}

/// Match a pattern against the full path, each path component, and each
/// directory prefix, so `generated/`, `*.min.js`, and `src/gen/**` all
/// behave the way an ignore file would.
fn hits(pattern: &Pattern, path: &str) -> bool {
    if pattern.matches(path) {
        return true;
    }

    let mut prefix = String::new();
    for component in path.split('/') {
        if pattern.matches(component) {
            return true;
        }
        if !prefix.is_empty() {
            prefix.push('/');
        }
        prefix.push_str(component);
        if pattern.matches(&prefix) {
            return true;
        }
    }
    false
}

/// Executable entry paths declared in the manifest's `bin` field.
fn manifest_bin_entries(dir: &Path) -> Vec<String> {
    let Ok(content) = std::fs::read_to_string(dir.join("package.json")) else {
        return Vec::new();
    };
    let Ok(manifest) = serde_json::from_str::<serde_json::Value>(&content) else {
        return Vec::new();
    };

    let normalize = |s: &str| s.trim_start_matches("./").to_string();
    match manifest.get("bin") {
        Some(serde_json::Value::String(path)) => vec![normalize(path)],
        Some(serde_json::Value::Object(map)) => map
            .values()
            .filter_map(|v| v.as_str())
            .map(normalize)
            .collect(),
        _ => Vec::new(),
    }
}
