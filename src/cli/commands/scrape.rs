//! Scrape command.

use console::style;

use crate::cli::icons::{arrow, success};
use crate::cli::progress::ScrapeProgressBar;
use crate::config::{Config, Settings};
use crate::models::EpisodeRecord;
use crate::pipeline::scrape;
use crate::scrapers::HttpClient;
use crate::storage::save_table;

/// Scrape every configured season, save the table, and return it.
pub async fn cmd_scrape(settings: &Settings, config: &Config) -> anyhow::Result<Vec<EpisodeRecord>> {
    settings.ensure_directories()?;
    let client = HttpClient::from_settings(settings)?;

    println!(
        "{} Scraping {} seasons of {}",
        style("→").cyan(),
        config.source.seasons,
        style(&config.source.show_id).bold()
    );

    let mut progress = ScrapeProgressBar::new();
    let outcome = scrape(&client, config, settings.failure_policy, &mut progress).await?;

    let table_path = settings.table_path();
    save_table(&table_path, &outcome.records)?;

    println!(
        "{} Scraped {} episodes",
        success(),
        outcome.records.len()
    );
    println!("  {} Table: {}", arrow(), table_path.display());
    if !outcome.missing.is_empty() {
        println!(
            "  {} {} pages skipped",
            style("!").yellow(),
            outcome.missing.len()
        );
        for missing in &outcome.missing {
            let episode = missing
                .global_index
                .map(|i| format!(" episode #{}", i))
                .unwrap_or_default();
            println!(
                "    season {}{} {}: {}",
                missing.season,
                episode,
                missing.page,
                style(&missing.error).dim()
            );
        }
    }

    Ok(outcome.records)
}
