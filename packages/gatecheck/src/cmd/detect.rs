//! Print the detected Project Descriptor for a directory.
//!
//! Debugging aid for the resolution table: shows exactly which commands
//! each phase resolved to, and which stayed unset.

use std::path::PathBuf;

use clap::Args;
use color_eyre::{Result, eyre::Context};
use gatecheck::detect;
use tracing::instrument;

#[derive(Args, Clone, Debug)]
pub struct Config {
    /// Project directory to inspect.
    #[arg(default_value = ".")]
    pub dir: PathBuf,
}

#[instrument]
pub fn main(config: Config) -> Result<()> {
    let descriptor = detect::project(&config.dir);
    let json = serde_json::to_string_pretty(&descriptor).context("serialize descriptor")?;
    println!("{json}");
    Ok(())
}
