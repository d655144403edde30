//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod analyze;
mod config_cmd;
mod scrape;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{load_settings_with_options, Config, FailurePolicy, LoadOptions, Settings};

#[derive(Parser)]
#[command(name = "episcope")]
#[command(about = "Episode metadata scraper and rating analysis")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true, env = "EPISCOPE_CONFIG")]
    config: Option<PathBuf>,

    /// Output directory for the table, report and charts (overrides config file)
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

/// Flags shared by commands that scrape.
#[derive(Args, Debug, Clone, Default)]
struct ScrapeArgs {
    /// Abort on the first page that cannot be fetched (default)
    #[arg(long, conflicts_with = "skip_failed")]
    fail_fast: bool,

    /// Record pages that cannot be fetched and keep going
    #[arg(long)]
    skip_failed: bool,

    /// Number of seasons to scrape (overrides config file)
    #[arg(short, long)]
    seasons: Option<u32>,
}

impl ScrapeArgs {
    /// Apply command-line overrides onto the loaded configuration.
    fn apply(&self, settings: &mut Settings, config: &mut Config) {
        if self.fail_fast {
            settings.failure_policy = FailurePolicy::FailFast;
        } else if self.skip_failed {
            settings.failure_policy = FailurePolicy::SkipAndContinue;
        }
        if let Some(seasons) = self.seasons {
            config.source.seasons = seasons;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every season and write the episode table
    Scrape {
        #[command(flatten)]
        args: ScrapeArgs,
    },

    /// Analyze a saved episode table and write the report and charts
    Analyze {
        /// Table to analyze (default: episodes.csv in the output directory)
        #[arg(long)]
        table: Option<PathBuf>,
        /// Number of terms in the frequency tables (overrides config file)
        #[arg(long)]
        top: Option<usize>,
    },

    /// Scrape, then analyze the fresh table
    Run {
        #[command(flatten)]
        args: ScrapeArgs,
        /// Number of terms in the frequency tables (overrides config file)
        #[arg(long)]
        top: Option<usize>,
    },

    /// Print the effective configuration as TOML
    Config,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        output_dir: cli.output_dir,
    };
    let (mut settings, mut config) = load_settings_with_options(options)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    match cli.command {
        Commands::Scrape { args } => {
            args.apply(&mut settings, &mut config);
            scrape::cmd_scrape(&settings, &config).await.map(|_| ())
        }
        Commands::Analyze { table, top } => {
            if let Some(top) = top {
                config.analysis.top_terms = top;
            }
            analyze::cmd_analyze(&settings, &config, table.as_deref())
        }
        Commands::Run { args, top } => {
            args.apply(&mut settings, &mut config);
            if let Some(top) = top {
                config.analysis.top_terms = top;
            }
            let records = scrape::cmd_scrape(&settings, &config).await?;
            analyze::analyze_records(&settings, &config, &records)
        }
        Commands::Config => config_cmd::cmd_config(&settings, &config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn scrape_flags_override_policy_and_seasons() {
        let cli = Cli::try_parse_from(["episcope", "scrape", "--skip-failed", "--seasons", "3"])
            .unwrap();
        let Commands::Scrape { args } = cli.command else {
            panic!("expected scrape");
        };

        let mut settings = Settings::default();
        let mut config = Config::with_defaults();
        args.apply(&mut settings, &mut config);

        assert_eq!(settings.failure_policy, FailurePolicy::SkipAndContinue);
        assert_eq!(config.source.seasons, 3);
    }

    #[test]
    fn conflicting_policy_flags_are_rejected() {
        assert!(
            Cli::try_parse_from(["episcope", "run", "--fail-fast", "--skip-failed"]).is_err()
        );
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::try_parse_from([
            "episcope",
            "analyze",
            "--table",
            "saved.csv",
            "--top",
            "5",
            "-o",
            "/tmp/out",
            "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.output_dir, Some(PathBuf::from("/tmp/out")));
        match cli.command {
            Commands::Analyze { table, top } => {
                assert_eq!(table, Some(PathBuf::from("saved.csv")));
                assert_eq!(top, Some(5));
            }
            _ => panic!("expected analyze"),
        }
    }
}
