//! Per-project configuration surface.
//!
//! All configuration lives in a `.gatecheck/` directory at the project
//! root, and the mechanism is deliberately minimal: line-delimited list
//! files and presence-checked marker files. A missing file is a
//! first-class empty state, never an error.

use std::fs::read_to_string;
use std::path::{Path, PathBuf};

use crate::classify::EventKind;

/// The project configuration directory.
pub const CONFIG_DIR: &str = ".gatecheck";

/// Path globs excluded from verification, one per line.
const SKIP_FILE: &str = "skip";

/// Acknowledged vulnerability identifiers, one per line.
const AUDIT_ALLOWLIST_FILE: &str = "audit-allowlist";

/// User-declared skip patterns from `.gatecheck/skip`.
pub fn skip_patterns(dir: &Path) -> Vec<String> {
    read_lines(&dir.join(CONFIG_DIR).join(SKIP_FILE))
}

/// Acknowledged vulnerability identifiers from `.gatecheck/audit-allowlist`.
pub fn audit_allowlist(dir: &Path) -> Vec<String> {
    read_lines(&dir.join(CONFIG_DIR).join(AUDIT_ALLOWLIST_FILE))
}

/// Whether the tier for `kind` has been opted out via its marker file.
///
/// The existence check is the entire mechanism; the file's content is
/// ignored.
pub fn tier_disabled(dir: &Path, kind: EventKind) -> bool {
    marker_path(dir, kind).exists()
}

/// The opt-out marker path for `kind`, e.g. `.gatecheck/off-commit`.
pub fn marker_path(dir: &Path, kind: EventKind) -> PathBuf {
    dir.join(CONFIG_DIR).join(format!("off-{kind}"))
}

/// Read a line-delimited list file: `#` comments and blank lines are
/// ignored, everything else is returned trimmed. Missing or unreadable
/// files yield an empty list.
fn read_lines(path: &Path) -> Vec<String> {
    let Ok(content) = read_to_string(path) else {
        return Vec::new();
    };

    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
