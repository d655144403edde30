//! Analyze command.

use std::path::Path;

use crate::analysis::analyze;
use crate::charts::render_all;
use crate::cli::icons::{arrow, error, success};
use crate::config::{Config, Settings};
use crate::models::EpisodeRecord;
use crate::storage::{load_table, save_report};
use crate::tabulate::Tabulator;

/// Analyze a saved table.
pub fn cmd_analyze(settings: &Settings, config: &Config, table: Option<&Path>) -> anyhow::Result<()> {
    let default_table = settings.table_path();
    let table_path = table.unwrap_or(default_table.as_path());
    if !table_path.exists() {
        anyhow::bail!(
            "{} Table not found: {} (run 'episcope scrape' first)",
            error(),
            table_path.display()
        );
    }

    let mut records = load_table(table_path)?;
    Tabulator::from_config(config).rederive(&mut records);
    println!(
        "{} Loaded {} episodes from {}",
        success(),
        records.len(),
        table_path.display()
    );
    analyze_records(settings, config, &records)
}

/// Run every analysis, print the summary and write the report and charts.
pub fn analyze_records(
    settings: &Settings,
    config: &Config,
    records: &[EpisodeRecord],
) -> anyhow::Result<()> {
    settings.ensure_directories()?;
    let report = analyze(records, &config.analysis);
    report.print_summary();

    let report_path = settings.report_path();
    save_report(&report_path, &report)?;
    let charts = render_all(&settings.charts_dir(), records, &report)?;

    println!();
    println!("{} Analysis written", success());
    println!("  {} Report: {}", arrow(), report_path.display());
    println!(
        "  {} Charts: {} ({} files)",
        arrow(),
        settings.charts_dir().display(),
        charts.len()
    );
    Ok(())
}
