//! Responds to Claude Code `PreToolUse` hooks for shell commands.

use std::io;
use std::path::Path;

use clap::Args;
use color_eyre::{Result, eyre::Context};
use gatecheck::{
    classify::{self, EventKind, GitEvent},
    claude::hook::{Decision, HookInput},
    config, detect, review,
    runner::{self, ShellRunner},
    scope::ChangeScope,
};
use indoc::formatdoc;
use tap::Pipe;
use tracing::instrument;

#[derive(Args, Clone, Debug)]
pub struct Config {}

#[instrument]
pub fn main(_config: Config) -> Result<()> {
    let input = HookInput::read(io::stdin());
    tracing::debug!(?input, "read hook input");

    // Anything that is not a tracked git lifecycle event gets silence:
    // no output, exit 0. That includes non-Bash tools and commands the
    // classifier does not recognize.
    if !input.is_bash() {
        return Ok(());
    }
    let cwd = Path::new(&input.cwd);
    let Some(event) = classify::classify(&input.tool_input.command, cwd) else {
        return Ok(());
    };
    tracing::debug!(?event, "classified git lifecycle event");

    let decision = decide(&event);
    let response = decision.to_json().context("serialize hook response")?;
    println!("{response}");
    Ok(())
}

/// Run the verification pipeline for a classified event.
fn decide(event: &GitEvent) -> Decision {
    let dir = event.dir.as_path();
    let kind = event.kind;

    // Opt-out markers short-circuit before any external call.
    if config::tier_disabled(dir, kind) {
        return Decision::Allow {
            context: format!(
                "{kind} checks disabled by {}",
                config::marker_path(dir, kind).display()
            ),
        };
    }

    // Merge events carry only the advisory review fetch; verification
    // depth for the change set was pr-create's job.
    if kind == EventKind::PrMerge {
        return Decision::Allow {
            context: review::advisory(dir, event.pr_number.as_deref()).render(),
        };
    }

    let descriptor = detect::project(dir);
    let scope = ChangeScope::resolve(dir, kind);
    tracing::debug!(?descriptor, files = scope.files.len(), "resolved project and scope");

    if scope.docs_only() {
        return Decision::Allow {
            context: format!("documentation-only change; {kind} verification skipped"),
        };
    }

    let outcome = runner::run_tier(kind, dir, &descriptor, &scope, &mut ShellRunner);
    match outcome.failure() {
        None => Decision::Allow {
            context: format!("{kind} verification passed: {}", outcome.summary()),
        },
        Some(failure) => {
            let output = match &failure.outcome {
                runner::PhaseOutcome::Failed { output } => output.as_str(),
                _ => "",
            };
            formatdoc! {"
                {phase} failed for {kind}. Fix the issues below and retry the same command:

                {output}",
                phase = failure.phase,
            }
            .pipe(|summary| Decision::Deny { summary })
        }
    }
}
