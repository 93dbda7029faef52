//! Fail-fast tiered execution of verification phases.
//!
//! Phases are visited in a fixed order; tier membership only decides which
//! of them are visited at all. The first failing phase terminates the run,
//! and only its output is retained.

use std::path::Path;
use std::process::Command;

use derive_more::Display;
use itertools::Itertools;

use crate::classify::EventKind;
use crate::claude::hook::sanitize;
use crate::detect::ProjectDescriptor;
use crate::scan::{self, Depth};
use crate::scope::ChangeScope;

/// One verification step within a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Phase {
    #[display("build")]
    Build,

    #[display("typecheck")]
    Typecheck,

    #[display("lint")]
    Lint,

    #[display("security")]
    Security,

    #[display("test")]
    Test,
}

/// The phases a lifecycle event's tier visits, in execution order.
///
/// Precondition, not enforced: the push and pr-create tiers assume the
/// commit tier already validated build/typecheck/lint for the changes
/// being pushed. Nothing verifies that history; re-running those phases
/// here would only re-pay their cost on every push.
///
/// Within pr-create, security precedes test deliberately: pattern
/// matching over a diff is near-instant, a test suite is not, and a
/// one-line regex hit should not cost a full test run to discover.
pub fn phases_for(kind: EventKind) -> &'static [Phase] {
    match kind {
        EventKind::Commit => &[Phase::Build, Phase::Typecheck, Phase::Lint],
        EventKind::Push => &[Phase::Security],
        EventKind::PrCreate => &[Phase::Security, Phase::Test],
        // Merge verification is pr-create's job; the merge event only
        // carries the advisory review check, outside this runner.
        EventKind::PrMerge => &[],
    }
}

/// Outcome of one phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseOutcome {
    Passed,

    /// No command resolved for this phase, or the scan had nothing to
    /// scan. Never a failure.
    Skipped,

    Failed { output: String },
}

/// A phase paired with its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseResult {
    pub phase: Phase,
    pub outcome: PhaseOutcome,
}

/// The aggregate result of one tier run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierOutcome {
    pub results: Vec<PhaseResult>,
}

impl TierOutcome {
    /// The first (and only) failure, if the tier failed.
    pub fn failure(&self) -> Option<&PhaseResult> {
        self.results
            .iter()
            .find(|r| matches!(r.outcome, PhaseOutcome::Failed { .. }))
    }

    pub fn passed(&self) -> bool {
        self.failure().is_none()
    }

    /// One-line summary, e.g. `build passed, typecheck skipped, lint passed`.
    pub fn summary(&self) -> String {
        self.results
            .iter()
            .map(|r| {
                let state = match &r.outcome {
                    PhaseOutcome::Passed => "passed",
                    PhaseOutcome::Skipped => "skipped",
                    PhaseOutcome::Failed { .. } => "failed",
                };
                format!("{} {state}", r.phase)
            })
            .join(", ")
    }
}

/// Executes a phase's resolved command. The seam exists so the fail-fast
/// loop can be exercised without spawning processes.
pub trait CommandRunner {
    fn run(&mut self, dir: &Path, command: &str) -> CommandOutput;
}

/// What a phase command produced: its exit disposition and combined
/// stdout/stderr, already sanitized for serialization.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub output: String,
}

/// Runs phase commands through `sh -c` in the target directory, blocking
/// until completion.
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn run(&mut self, dir: &Path, command: &str) -> CommandOutput {
        let output = Command::new("sh").args(["-c", command]).current_dir(dir).output();

        match output {
            Ok(output) => {
                let mut combined = sanitize(&output.stdout);
                let stderr = sanitize(&output.stderr);
                if !stderr.is_empty() {
                    if !combined.is_empty() {
                        combined.push('\n');
                    }
                    combined.push_str(&stderr);
                }
                CommandOutput {
                    success: output.status.success(),
                    output: combined,
                }
            }
            // The shell itself failing to spawn is a phase failure: the
            // command was configured but could not be judged.
            Err(error) => CommandOutput {
                success: false,
                output: format!("failed to invoke command: {error}"),
            },
        }
    }
}

/// Run the tier for `kind` against the detected project and change scope.
pub fn run_tier(
    kind: EventKind,
    dir: &Path,
    descriptor: &ProjectDescriptor,
    scope: &ChangeScope,
    runner: &mut dyn CommandRunner,
) -> TierOutcome {
    let mut results = Vec::new();

    for &phase in phases_for(kind) {
        let outcome = match phase {
            Phase::Build => command_phase(runner, dir, descriptor.build.as_deref()),
            Phase::Typecheck => command_phase(runner, dir, descriptor.typecheck.as_deref()),
            Phase::Lint => command_phase(runner, dir, descriptor.lint.as_deref()),
            Phase::Test => command_phase(runner, dir, descriptor.test.as_deref()),
            Phase::Security => security_phase(dir, scope, Depth::for_event(kind), descriptor),
        };

        let failed = matches!(outcome, PhaseOutcome::Failed { .. });
        tracing::debug!(%phase, ?outcome, "phase complete");
        results.push(PhaseResult { phase, outcome });
        if failed {
            break;
        }
    }

    TierOutcome { results }
}

fn command_phase(
    runner: &mut dyn CommandRunner,
    dir: &Path,
    command: Option<&str>,
) -> PhaseOutcome {
    let Some(command) = command else {
        return PhaseOutcome::Skipped;
    };

    let result = runner.run(dir, command);
    if result.success {
        // Success output is discarded to keep the result object small.
        PhaseOutcome::Passed
    } else {
        PhaseOutcome::Failed {
            output: format!("$ {command}\n{}", result.output),
        }
    }
}

fn security_phase(
    dir: &Path,
    scope: &ChangeScope,
    depth: Depth,
    descriptor: &ProjectDescriptor,
) -> PhaseOutcome {
    let findings = scan::scan(dir, scope, depth, descriptor);
    if findings.is_empty() {
        PhaseOutcome::Passed
    } else {
        PhaseOutcome::Failed {
            output: findings.iter().map(scan::Finding::render).join("\n"),
        }
    }
}
