//! Dependency-vulnerability audit scoped to manifest deltas.
//!
//! The audit only runs when the ecosystem's manifest is part of the change
//! scope, and only counts advisories against dependencies the current
//! change introduces or moves — a full-repo audit on every PR would
//! surface pre-existing debt the author never touched. Identifiers in the
//! user's allowlist are acknowledged and excluded from the count.

use std::path::Path;
use std::process::Command;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::detect::{Ecosystem, PackageManager, ProjectDescriptor};
use crate::git;
use crate::scan::{Category, Finding};
use crate::scope::{ChangeScope, ScopeKind};

static GO_VULN_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"GO-\d{4}-\d+").unwrap());

/// Audit the dependency deltas of the change scope.
pub fn audit(
    dir: &Path,
    scope: &ChangeScope,
    descriptor: &ProjectDescriptor,
    allowlist: &[String],
) -> Vec<Finding> {
    match descriptor.ecosystem {
        Ecosystem::NodeTypescript | Ecosystem::NodeJavascript => {
            audit_node(dir, scope, descriptor.package_manager, allowlist)
        }
        Ecosystem::Go => audit_go(dir, scope, allowlist),
        _ => Vec::new(),
    }
}

/// The revision holding the pre-change manifest, if the scope is
/// diff-based. Under the whole-repository fallback every dependency
/// counts as newly introduced.
fn base_rev(scope: &ChangeScope) -> Option<&str> {
    match &scope.kind {
        ScopeKind::Staged => Some("HEAD"),
        ScopeKind::BranchDiff { base } => Some(base),
        ScopeKind::WholeRepo => None,
    }
}

fn manifest_changed(scope: &ChangeScope, manifest: &str) -> bool {
    scope.files.iter().any(|f| f.path == manifest)
}

fn audit_node(
    dir: &Path,
    scope: &ChangeScope,
    package_manager: Option<PackageManager>,
    allowlist: &[String],
) -> Vec<Finding> {
    if !manifest_changed(scope, "package.json") {
        return Vec::new();
    }

    let Ok(current) = std::fs::read_to_string(dir.join("package.json")) else {
        return Vec::new();
    };
    let base = base_rev(scope).and_then(|rev| git::show_file(dir, rev, "package.json"));
    let delta = node_dependency_delta(base.as_deref(), &current);
    if delta.is_empty() {
        return Vec::new();
    }

    let audit_command = match package_manager.unwrap_or(PackageManager::Npm) {
        PackageManager::Npm => ["npm", "audit", "--json"],
        PackageManager::Pnpm => ["pnpm", "audit", "--json"],
        PackageManager::Yarn => ["yarn", "audit", "--json"],
        // bun has no audit subcommand; detection gap, not a failure.
        PackageManager::Bun => return Vec::new(),
    };

    // Audit exits nonzero when vulnerabilities exist; the JSON is on
    // stdout either way. A missing tool skips the audit entirely.
    let Ok(output) = Command::new(audit_command[0])
        .args(&audit_command[1..])
        .current_dir(dir)
        .output()
    else {
        return Vec::new();
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_npm_audit(&stdout, &delta, allowlist)
}

/// Dependency names added or version-changed between the base and current
/// manifests. A missing base means everything currently declared counts.
fn node_dependency_delta(base: Option<&str>, current: &str) -> Vec<String> {
    let current_deps = node_dependencies(current);
    let base_deps = base.map(node_dependencies).unwrap_or_default();

    current_deps
        .into_iter()
        .filter(|(name, version)| base_deps.get(name) != Some(version))
        .map(|(name, _)| name)
        .collect()
}

fn node_dependencies(manifest: &str) -> std::collections::BTreeMap<String, String> {
    let mut deps = std::collections::BTreeMap::new();
    let Ok(value) = serde_json::from_str::<Value>(manifest) else {
        return deps;
    };

    for section in ["dependencies", "devDependencies"] {
        if let Some(Value::Object(map)) = value.get(section) {
            for (name, version) in map {
                if let Some(version) = version.as_str() {
                    deps.insert(name.clone(), version.to_string());
                }
            }
        }
    }
    deps
}

/// Parse npm-audit JSON, accepting both the v2 (`vulnerabilities`) and v1
/// (`advisories`) shapes. Unknown shapes degrade to no findings.
fn parse_npm_audit(json: &str, delta: &[String], allowlist: &[String]) -> Vec<Finding> {
    let Ok(value) = serde_json::from_str::<Value>(json) else {
        return Vec::new();
    };

    let mut findings = Vec::new();

    if let Some(Value::Object(vulnerabilities)) = value.get("vulnerabilities") {
        for (name, entry) in vulnerabilities {
            if !delta.contains(name) {
                continue;
            }
            for via in entry.get("via").and_then(Value::as_array).into_iter().flatten() {
                // Transitive entries are bare strings; direct advisories
                // are objects with a URL carrying the identifier.
                let Some(via) = via.as_object() else { continue };
                let id = via
                    .get("url")
                    .and_then(Value::as_str)
                    .and_then(|url| url.rsplit('/').next())
                    .unwrap_or("unknown-advisory");
                if allowed(id, allowlist) {
                    continue;
                }
                let title = via.get("title").and_then(Value::as_str).unwrap_or("");
                findings.push(advisory_finding(name, id, title));
            }
        }
    } else if let Some(Value::Object(advisories)) = value.get("advisories") {
        for advisory in advisories.values() {
            let name = advisory
                .get("module_name")
                .and_then(Value::as_str)
                .unwrap_or_default();
            if !delta.iter().any(|d| d == name) {
                continue;
            }
            let id = advisory
                .get("github_advisory_id")
                .and_then(Value::as_str)
                .unwrap_or("unknown-advisory");
            if allowed(id, allowlist) {
                continue;
            }
            let title = advisory.get("title").and_then(Value::as_str).unwrap_or("");
            findings.push(advisory_finding(name, id, title));
        }
    }

    findings
}

fn advisory_finding(name: &str, id: &str, title: &str) -> Finding {
    Finding {
        file: "package.json".to_string(),
        line: None,
        category: Category::VulnerableDependency,
        snippet: format!("{name}: {id} {title}").trim_end().to_string(),
    }
}

fn audit_go(dir: &Path, scope: &ChangeScope, allowlist: &[String]) -> Vec<Finding> {
    if !manifest_changed(scope, "go.mod") {
        return Vec::new();
    }
    if which::which("govulncheck").is_err() {
        return Vec::new();
    }

    let Ok(current) = std::fs::read_to_string(dir.join("go.mod")) else {
        return Vec::new();
    };
    let base = base_rev(scope).and_then(|rev| git::show_file(dir, rev, "go.mod"));
    let delta = go_module_delta(base.as_deref(), &current);
    if delta.is_empty() {
        return Vec::new();
    }

    let Ok(output) = Command::new("govulncheck")
        .arg("./...")
        .current_dir(dir)
        .output()
    else {
        return Vec::new();
    };

    let report = String::from_utf8_lossy(&output.stdout);
    parse_govulncheck(&report, &delta, allowlist)
}

/// Module paths newly required or version-bumped in go.mod.
fn go_module_delta(base: Option<&str>, current: &str) -> Vec<String> {
    let current_mods = go_requires(current);
    let base_mods = base.map(go_requires).unwrap_or_default();

    current_mods
        .into_iter()
        .filter(|(path, version)| base_mods.get(path) != Some(version))
        .map(|(path, _)| path)
        .collect()
}

fn go_requires(gomod: &str) -> std::collections::BTreeMap<String, String> {
    let mut requires = std::collections::BTreeMap::new();
    let mut in_block = false;

    for line in gomod.lines() {
        let line = line.trim();
        if line.starts_with("require (") {
            in_block = true;
            continue;
        }
        if in_block && line == ")" {
            in_block = false;
            continue;
        }

        let entry = if in_block {
            Some(line)
        } else {
            line.strip_prefix("require ")
        };
        if let Some(entry) = entry {
            let mut fields = entry.split_whitespace();
            if let (Some(path), Some(version)) = (fields.next(), fields.next()) {
                requires.insert(path.to_string(), version.to_string());
            }
        }
    }
    requires
}

/// Parse govulncheck's plain-text report into per-vulnerability findings,
/// keeping only those whose module is in the delta.
fn parse_govulncheck(report: &str, delta: &[String], allowlist: &[String]) -> Vec<Finding> {
    let mut findings = Vec::new();
    let mut current_id: Option<String> = None;

    for line in report.lines() {
        if let Some(found) = GO_VULN_ID.find(line) {
            current_id = Some(found.as_str().to_string());
        }
        if let Some(module) = line.trim().strip_prefix("Module:").map(str::trim) {
            let Some(id) = current_id.take() else { continue };
            if !delta.iter().any(|d| d == module) || allowed(&id, allowlist) {
                continue;
            }
            findings.push(Finding {
                file: "go.mod".to_string(),
                line: None,
                category: Category::VulnerableDependency,
                snippet: format!("{module}: {id}"),
            });
        }
    }
    findings
}

fn allowed(id: &str, allowlist: &[String]) -> bool {
    allowlist.iter().any(|entry| entry == id)
}
