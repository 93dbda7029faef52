//! Install the gatecheck hook into Claude Code settings.

use std::env;
use std::fs;
use std::path::PathBuf;

use clap::Args;
use color_eyre::{
    Result,
    eyre::{Context, OptionExt, bail},
};
use serde_json::{Value, json};
use tracing::instrument;

#[derive(Args, Clone, Debug)]
pub struct Config {
    /// Path to the .claude directory.
    #[arg(long, default_value = ".claude")]
    claude_dir: PathBuf,

    /// Seconds Claude Code waits for the hook before giving up. Builds
    /// and tests run inside the hook, so the default is generous.
    #[arg(long, default_value_t = 600)]
    timeout: u32,
}

#[instrument]
pub fn main(config: Config) -> Result<()> {
    fs::create_dir_all(&config.claude_dir).context("create .claude directory")?;

    let dotclaude = config
        .claude_dir
        .canonicalize()
        .with_context(|| format!("canonicalize claude dir: {:?}", config.claude_dir))?;
    let settings_file = dotclaude.join("settings.local.json");

    let gatecheck_path = env::current_exe()
        .context("get current executable path")?
        .to_str()
        .ok_or_eyre("convert current executable path to string")?
        .to_string();

    let desired = json!({
        "matcher": "Bash",
        "hooks": [{
            "type": "command",
            "command": format!("{gatecheck_path} hook"),
            "timeout": config.timeout,
        }],
    });

    let mut settings = if settings_file.exists() {
        let content =
            fs::read_to_string(&settings_file).context("read existing settings.local.json")?;
        serde_json::from_str::<Value>(&content).context("parse existing settings.local.json")?
    } else {
        json!({})
    };

    // Merge into the existing settings as a `Value` so unrelated settings
    // survive untouched; `preserve_order` keeps the diff minimal.
    let Value::Object(settings) = &mut settings else {
        bail!("expected settings to be an object, got: {settings:?}");
    };
    let hooks = settings.entry("hooks").or_insert_with(|| json!({}));
    let Value::Object(hooks) = hooks else {
        bail!("expected hooks to be an object, got: {hooks:?}");
    };
    let entry = hooks.entry("PreToolUse").or_insert_with(|| json!([]));
    let Value::Array(matchers) = entry else {
        bail!("expected PreToolUse matchers to be an array, got: {entry:?}");
    };
    if !matchers.contains(&desired) {
        matchers.push(desired);
    }

    let settings_json = serde_json::to_string_pretty(&settings).context("serialize settings")?;
    fs::write(&settings_file, settings_json).context("write settings file")?;

    println!("\u{2713} Wrote hook configuration to {}", settings_file.display());
    println!();
    println!("Next steps:");
    println!("1. Run /hooks in Claude Code to verify the hook is registered");
    println!("2. Use `claude --debug` to see hook execution logs");
    println!("3. Opt a project out of a tier with e.g. `touch .gatecheck/off-commit`");

    Ok(())
}
