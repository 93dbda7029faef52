//! Run a verification tier directly against a project directory.
//!
//! This is the same pipeline the hook runs, surfaced for CI and manual
//! use: human-readable phase results on stdout, exit 1 on failure.

use std::path::PathBuf;
use std::process;

use clap::Args;
use color_eyre::Result;
use gatecheck::{
    classify::EventKind,
    config, detect,
    runner::{self, PhaseOutcome, ShellRunner},
    scope::ChangeScope,
};
use tracing::instrument;

#[derive(Args, Clone, Debug)]
pub struct Config {
    /// The lifecycle event whose tier to run.
    #[arg(long, value_parser = parse_event, default_value = "commit")]
    pub event: EventKind,

    /// Project directory to check.
    #[arg(default_value = ".")]
    pub dir: PathBuf,
}

fn parse_event(value: &str) -> Result<EventKind, String> {
    match value {
        "commit" => Ok(EventKind::Commit),
        "push" => Ok(EventKind::Push),
        "pr-create" => Ok(EventKind::PrCreate),
        "pr-merge" => Ok(EventKind::PrMerge),
        other => Err(format!(
            "unknown event `{other}` (expected commit, push, pr-create, or pr-merge)"
        )),
    }
}

#[instrument]
pub fn main(config: Config) -> Result<()> {
    let dir = config.dir.as_path();

    if config::tier_disabled(dir, config.event) {
        println!(
            "{} checks disabled by {}",
            config.event,
            config::marker_path(dir, config.event).display()
        );
        return Ok(());
    }

    let descriptor = detect::project(dir);
    let scope = ChangeScope::resolve(dir, config.event);
    println!(
        "ecosystem: {} ({} changed files in scope)",
        descriptor.ecosystem,
        scope.files.len()
    );

    if scope.docs_only() {
        println!("documentation-only change; verification skipped");
        return Ok(());
    }

    let outcome = runner::run_tier(config.event, dir, &descriptor, &scope, &mut ShellRunner);
    for result in &outcome.results {
        match &result.outcome {
            PhaseOutcome::Passed => println!("\u{2713} {}", result.phase),
            PhaseOutcome::Skipped => println!("- {} (skipped, no command)", result.phase),
            PhaseOutcome::Failed { output } => {
                println!("\u{2717} {}", result.phase);
                println!();
                println!("{output}");
            }
        }
    }

    if !outcome.passed() {
        process::exit(1);
    }
    Ok(())
}
