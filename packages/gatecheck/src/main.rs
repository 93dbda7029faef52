//! Gatecheck gates git lifecycle operations behind incremental verification.

use color_eyre::{Result, Section};
use tracing::{instrument, level_filters::LevelFilter};

mod cmd;

use clap::{Parser, Subcommand};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Gatecheck verifies changes before commits, pushes, and pull requests.
#[derive(Parser)]
#[command(author, version = env!("GATECHECK_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Respond to a Claude Code PreToolUse hook on stdin.
    Hook(cmd::hook::Config),

    /// Run a verification tier directly against a project directory.
    Check(cmd::check::Config),

    /// Print the detected ecosystem and tool commands for a directory.
    Detect(cmd::detect::Config),

    /// Install the gatecheck hook into Claude Code settings.
    Setup(cmd::setup::Config),
}

#[instrument]
fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    // Claude Code invokes `gatecheck hook` as a subprocess and surfaces its
    // stderr when a hook denies, so by default only errors are logged. The
    // tracing usage in this binary exists to support manual debugging via
    // `GATECHECK_LOG` directives (e.g. `GATECHECK_LOG=debug`).
    tracing_subscriber::registry()
        .with(ErrorLayer::default())
        .with(
            fmt::layer()
                .with_level(true)
                .with_file(true)
                .with_line_number(true)
                .with_target(true)
                .pretty(),
        )
        .with(
            EnvFilter::builder()
                .with_env_var("GATECHECK_LOG")
                .with_default_directive(LevelFilter::ERROR.into())
                .from_env_lossy(),
        )
        .init();

    match cli.command {
        Commands::Hook(config) => cmd::hook::main(config),
        Commands::Check(config) => cmd::check::main(config),
        Commands::Detect(config) => cmd::detect::main(config),
        Commands::Setup(config) => cmd::setup::main(config),
    }
    .suggestion("Run with GATECHECK_LOG=debug for a trace of the verification pipeline.")
}
