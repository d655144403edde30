//! Configuration command.

use console::style;

use crate::config::{Config, Settings};

/// Print where the config came from, the resolved settings, and the full config as TOML.
pub fn cmd_config(settings: &Settings, config: &Config) -> anyhow::Result<()> {
    let source = config
        .source_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults (no config file found)".to_string());

    println!("{} {}", style("# Source:").dim(), source);
    println!(
        "{} output_dir = {}",
        style("# Resolved:").dim(),
        settings.output_dir.display()
    );
    println!(
        "{} failure_policy = {}, request_timeout = {}s",
        style("# Resolved:").dim(),
        settings.failure_policy.as_str(),
        settings.request_timeout
    );
    println!();

    let rendered = config.to_toml().map_err(|e| anyhow::anyhow!(e))?;
    println!("{}", rendered);
    Ok(())
}
