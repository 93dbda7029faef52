//! Project ecosystem and tool-command detection.
//!
//! Detection is a pure read of filesystem state at call time: the
//! ecosystem comes from a priority-ordered marker-file table, and each
//! phase command from a declarative fallback chain. Adding an ecosystem
//! means adding table rows, not control flow.

use std::fs::read_to_string;
use std::path::Path;

use derive_more::Display;
use serde::Serialize;

/// Detected facts about a target codebase.
///
/// Each command is optional; `None` is a first-class "no-op" state meaning
/// the phase is skipped, never failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectDescriptor {
    pub ecosystem: Ecosystem,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_manager: Option<PackageManager>,
    pub build: Option<String>,
    pub typecheck: Option<String>,
    pub lint: Option<String>,
    pub test: Option<String>,
}

/// The detected language/toolchain family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Ecosystem {
    #[display("go")]
    Go,
    #[display("node-typescript")]
    NodeTypescript,
    #[display("node-javascript")]
    NodeJavascript,
    #[display("python")]
    Python,
    #[display("rust")]
    Rust,
    #[display("unknown")]
    Unknown,
}

/// Node-family package manager, detected from lockfiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    #[display("npm")]
    Npm,
    #[display("pnpm")]
    Pnpm,
    #[display("yarn")]
    Yarn,
    #[display("bun")]
    Bun,
}

/// Ecosystem marker table, checked in order; the first row whose marker
/// files are all present wins. Presence of markers is the only signal —
/// content is never sniffed.
const MARKERS: &[(Ecosystem, &[&str])] = &[
    (Ecosystem::Go, &["go.mod"]),
    (Ecosystem::NodeTypescript, &["tsconfig.json", "package.json"]),
    (Ecosystem::NodeJavascript, &["package.json"]),
    (Ecosystem::Python, &["pyproject.toml"]),
    (Ecosystem::Python, &["setup.py"]),
    (Ecosystem::Python, &["requirements.txt"]),
    (Ecosystem::Rust, &["Cargo.toml"]),
];

/// One step of a phase's command-resolution chain.
#[derive(Debug, Clone, Copy)]
enum Resolver {
    /// A Makefile target, preferred unconditionally when defined.
    MakeTarget(&'static str),

    /// A manifest `scripts` entry, run via the detected package manager.
    Script(&'static str),

    /// A direct tool invocation, gated on one of its config files existing.
    IfConfig(&'static [&'static str], &'static str),

    /// A direct tool invocation, gated on the binary being on PATH.
    IfInstalled(&'static str, &'static str),

    /// The ecosystem's native toolchain invocation, always available.
    Native(&'static str),
}

use self::Resolver::*;

const ESLINT_CONFIGS: &[&str] = &[
    ".eslintrc",
    ".eslintrc.json",
    ".eslintrc.js",
    ".eslintrc.cjs",
    ".eslintrc.yaml",
    ".eslintrc.yml",
    "eslint.config.js",
    "eslint.config.mjs",
    "eslint.config.ts",
];

const JEST_CONFIGS: &[&str] = &["jest.config.js", "jest.config.ts", "jest.config.mjs", "jest.config.json"];
const VITEST_CONFIGS: &[&str] = &["vitest.config.js", "vitest.config.ts", "vitest.config.mts"];
const TSC_CONFIGS: &[&str] = &["tsconfig.json"];

/// Per-phase resolution chains for one ecosystem. An empty chain means
/// the phase is intentionally unset (e.g. Go's typecheck: `go build`
/// subsumes type checking, so a separate phase would only duplicate it).
struct Chains {
    build: &'static [Resolver],
    typecheck: &'static [Resolver],
    lint: &'static [Resolver],
    test: &'static [Resolver],
}

fn chains(ecosystem: Ecosystem) -> Chains {
    match ecosystem {
        Ecosystem::Go => Chains {
            build: &[MakeTarget("build"), Native("go build ./...")],
            typecheck: &[],
            lint: &[
                MakeTarget("lint"),
                MakeTarget("vet"),
                IfInstalled("golangci-lint", "golangci-lint run"),
                Native("go vet ./..."),
            ],
            test: &[MakeTarget("test"), Native("go test ./...")],
        },
        Ecosystem::NodeTypescript => Chains {
            build: &[Script("build")],
            typecheck: &[
                Script("typecheck"),
                Script("type-check"),
                IfConfig(TSC_CONFIGS, "npx tsc --noEmit"),
            ],
            lint: &[Script("lint"), IfConfig(ESLINT_CONFIGS, "npx eslint .")],
            test: &[
                Script("test"),
                IfConfig(JEST_CONFIGS, "npx jest"),
                IfConfig(VITEST_CONFIGS, "npx vitest run"),
            ],
        },
        Ecosystem::NodeJavascript => Chains {
            build: &[Script("build")],
            typecheck: &[Script("typecheck"), Script("type-check")],
            lint: &[Script("lint"), IfConfig(ESLINT_CONFIGS, "npx eslint .")],
            test: &[
                Script("test"),
                IfConfig(JEST_CONFIGS, "npx jest"),
                IfConfig(VITEST_CONFIGS, "npx vitest run"),
            ],
        },
        Ecosystem::Python => Chains {
            build: &[],
            typecheck: &[],
            lint: &[IfInstalled("ruff", "ruff check .")],
            test: &[IfInstalled("pytest", "pytest")],
        },
        Ecosystem::Rust => Chains {
            build: &[Native("cargo check")],
            typecheck: &[],
            lint: &[Native("cargo clippy -- -D warnings")],
            test: &[Native("cargo test")],
        },
        Ecosystem::Unknown => Chains {
            build: &[],
            typecheck: &[],
            lint: &[],
            test: &[],
        },
    }
}

/// Detect the Project Descriptor for `dir`.
pub fn project(dir: &Path) -> ProjectDescriptor {
    let ecosystem = detect_ecosystem(dir);
    let package_manager = match ecosystem {
        Ecosystem::NodeTypescript | Ecosystem::NodeJavascript => Some(detect_package_manager(dir)),
        _ => None,
    };
    let scripts = manifest_scripts(dir);
    let table = chains(ecosystem);

    let resolve = |chain: &[Resolver]| resolve_chain(dir, chain, package_manager, &scripts);
    ProjectDescriptor {
        ecosystem,
        package_manager,
        build: resolve(table.build),
        typecheck: resolve(table.typecheck),
        lint: resolve(table.lint),
        test: resolve(table.test),
    }
}

fn detect_ecosystem(dir: &Path) -> Ecosystem {
    for (ecosystem, markers) in MARKERS {
        if markers.iter().all(|m| dir.join(m).exists()) {
            return *ecosystem;
        }
    }
    Ecosystem::Unknown
}

fn detect_package_manager(dir: &Path) -> PackageManager {
    if dir.join("bun.lockb").exists() {
        PackageManager::Bun
    } else if dir.join("pnpm-lock.yaml").exists() {
        PackageManager::Pnpm
    } else if dir.join("yarn.lock").exists() {
        PackageManager::Yarn
    } else {
        PackageManager::Npm
    }
}

fn resolve_chain(
    dir: &Path,
    chain: &[Resolver],
    package_manager: Option<PackageManager>,
    scripts: &serde_json::Map<String, serde_json::Value>,
) -> Option<String> {
    for resolver in chain {
        let command = match resolver {
            MakeTarget(target) => {
                makefile_has_target(dir, target).then(|| format!("make {target}"))
            }
            Script(name) => declared_script(scripts, name).map(|_| {
                let pm = package_manager.unwrap_or(PackageManager::Npm);
                format!("{pm} run {name}")
            }),
            IfConfig(configs, command) => configs
                .iter()
                .any(|c| dir.join(c).exists())
                .then(|| command.to_string()),
            IfInstalled(binary, command) => {
                which::which(binary).is_ok().then(|| command.to_string())
            }
            Native(command) => Some(command.to_string()),
        };
        if command.is_some() {
            return command;
        }
    }
    None
}

/// Look up a declared script, ignoring npm init's failing placeholder.
fn declared_script<'a>(
    scripts: &'a serde_json::Map<String, serde_json::Value>,
    name: &str,
) -> Option<&'a str> {
    scripts
        .get(name)
        .and_then(|v| v.as_str())
        .filter(|v| !v.contains("no test specified"))
}

fn manifest_scripts(dir: &Path) -> serde_json::Map<String, serde_json::Value> {
    let Ok(content) = read_to_string(dir.join("package.json")) else {
        return serde_json::Map::new();
    };

    serde_json::from_str::<serde_json::Value>(&content)
        .ok()
        .and_then(|manifest| manifest.get("scripts").cloned())
        .and_then(|scripts| match scripts {
            serde_json::Value::Object(map) => Some(map),
            _ => None,
        })
        .unwrap_or_default()
}

/// Whether the directory's Makefile defines `target` as a rule.
fn makefile_has_target(dir: &Path, target: &str) -> bool {
    let Ok(content) = read_to_string(dir.join("Makefile")) else {
        return false;
    };
    makefile_content_has_target(&content, target)
}

fn makefile_content_has_target(content: &str, target: &str) -> bool {
    content.lines().any(|line| {
        let Some(rest) = line.strip_prefix(target) else {
            return false;
        };
        // `target:` or `target : deps`, but not `target := value`.
        let rest = rest.trim_start();
        rest.starts_with(':') && !rest.starts_with(":=")
    })
}
