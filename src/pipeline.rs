//! Scrape pipeline: fetch → parse → tabulate.
//!
//! Pages are fetched one at a time in a fixed order (season listing, then for
//! each episode its keyword page and credits page). Per-page fetch failures
//! are handled by the configured `FailurePolicy`; parse failures of structural
//! fields always abort the run.

use thiserror::Error;
use tracing::{info, warn};

use crate::config::{Config, FailurePolicy};
use crate::models::{EpisodeRecord, PageKind};
use crate::parsers::{parse_credits, parse_keywords, parse_listing, ParseError, Selectors};
use crate::scrapers::{EpisodeFetcher, FetchError, PageSource};
use crate::tabulate::{ScrapedEpisode, TabulateError, Tabulator};

/// Pipeline stage names used in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Setup,
    Fetch,
    Parse,
    Tabulate,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Setup => "setup",
            Stage::Fetch => "fetch",
            Stage::Parse => "parse",
            Stage::Tabulate => "tabulate",
        }
    }
}

/// A run-ending failure, naming the stage and where it happened.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("setup failed: {0}")]
    Selectors(#[source] ParseError),

    #[error("fetch failed for season {season}{} ({page} page): {source}", episode_label(.global_index))]
    Fetch {
        season: u32,
        global_index: Option<u32>,
        page: PageKind,
        #[source]
        source: FetchError,
    },

    #[error("parse failed for season {season} listing: {source}")]
    Parse {
        season: u32,
        #[source]
        source: ParseError,
    },

    #[error("tabulate failed: {0}")]
    Tabulate(#[from] TabulateError),
}

fn episode_label(global_index: &Option<u32>) -> String {
    match global_index {
        Some(index) => format!(", episode #{}", index),
        None => String::new(),
    }
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Selectors(_) => Stage::Setup,
            PipelineError::Fetch { .. } => Stage::Fetch,
            PipelineError::Parse { .. } => Stage::Parse,
            PipelineError::Tabulate(_) => Stage::Tabulate,
        }
    }
}

/// A page skipped under `FailurePolicy::SkipAndContinue`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingPage {
    pub season: u32,
    /// Index the episode was assigned (or would have been) in scrape order.
    pub global_index: Option<u32>,
    pub page: PageKind,
    pub error: String,
}

/// Result of a completed scrape.
#[derive(Debug, Clone, Default)]
pub struct ScrapeOutcome {
    pub records: Vec<EpisodeRecord>,
    pub missing: Vec<MissingPage>,
}

/// Progress callbacks for long scrapes. Every method defaults to a no-op.
pub trait ScrapeProgress {
    fn season_started(&mut self, _season: u32, _episodes: usize) {}
    fn episode_done(&mut self, _global_index: u32, _title: &str) {}
    fn page_skipped(&mut self, _missing: &MissingPage) {}
    fn finished(&mut self) {}
}

impl ScrapeProgress for () {}

/// Scrape every configured season and assemble the table.
pub async fn scrape(
    source: &dyn PageSource,
    config: &Config,
    policy: FailurePolicy,
    progress: &mut dyn ScrapeProgress,
) -> Result<ScrapeOutcome, PipelineError> {
    let selectors = Selectors::compile(&config.selectors).map_err(PipelineError::Selectors)?;
    let fetcher = EpisodeFetcher::new(source, &config.source);

    let mut scraped: Vec<ScrapedEpisode> = Vec::new();
    let mut missing: Vec<MissingPage> = Vec::new();

    info!(
        "Scraping {} seasons of {} ({})",
        config.source.seasons,
        config.source.show_id,
        policy.as_str()
    );

    for season in 1..=config.source.seasons {
        let listing = match fetcher.fetch_listing(season).await {
            Ok(html) => html,
            Err(e) => {
                absorb(policy, season, None, PageKind::Listing, e, &mut missing, progress)?;
                continue;
            }
        };

        let rows = parse_listing(&listing, &selectors)
            .map_err(|source| PipelineError::Parse { season, source })?;
        progress.season_started(season, rows.len());

        for row in rows {
            let global_index = scraped.len() as u32 + 1;
            let link = fetcher
                .resolve_link(&row.link)
                .map_err(|source| PipelineError::Fetch {
                    season,
                    global_index: Some(global_index),
                    page: PageKind::Listing,
                    source,
                })?;

            let keywords = match fetcher.fetch_keywords(&link).await {
                Ok(html) => Some(parse_keywords(&html, &selectors)),
                Err(e) => {
                    absorb(
                        policy,
                        season,
                        Some(global_index),
                        PageKind::Keywords,
                        e,
                        &mut missing,
                        progress,
                    )?;
                    None
                }
            };

            let credit_text = match fetcher.fetch_credits(&link).await {
                Ok(html) => {
                    let text = parse_credits(&html, &selectors);
                    if text.is_none() {
                        warn!(
                            "Episode #{} ({}): no director credit found",
                            global_index, row.title
                        );
                    }
                    text
                }
                Err(e) => {
                    absorb(
                        policy,
                        season,
                        Some(global_index),
                        PageKind::Credits,
                        e,
                        &mut missing,
                        progress,
                    )?;
                    None
                }
            };

            progress.episode_done(global_index, &row.title);
            scraped.push(ScrapedEpisode {
                season,
                row,
                link,
                keywords,
                credit_text,
            });
        }
    }

    let records = Tabulator::from_config(config).tabulate(scraped)?;
    progress.finished();

    info!(
        "Scraped {} episodes ({} pages skipped)",
        records.len(),
        missing.len()
    );

    Ok(ScrapeOutcome { records, missing })
}

/// Apply the failure policy to one failed page.
fn absorb(
    policy: FailurePolicy,
    season: u32,
    global_index: Option<u32>,
    page: PageKind,
    error: FetchError,
    missing: &mut Vec<MissingPage>,
    progress: &mut dyn ScrapeProgress,
) -> Result<(), PipelineError> {
    match policy {
        FailurePolicy::FailFast => Err(PipelineError::Fetch {
            season,
            global_index,
            page,
            source: error,
        }),
        FailurePolicy::SkipAndContinue => {
            warn!(
                "Skipping season {}{} {} page: {}",
                season,
                episode_label(&global_index),
                page,
                error
            );
            let entry = MissingPage {
                season,
                global_index,
                page,
                error: error.to_string(),
            };
            progress.page_skipped(&entry);
            missing.push(entry);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::StaticPages;

    #[test]
    fn error_display_names_stage_and_episode() {
        let err = PipelineError::Fetch {
            season: 2,
            global_index: Some(14),
            page: PageKind::Credits,
            source: FetchError::Status {
                url: "https://example.com".to_string(),
                status: 503,
            },
        };

        let msg = err.to_string();
        assert!(msg.contains("season 2"));
        assert!(msg.contains("episode #14"));
        assert!(msg.contains("credits"));
        assert_eq!(err.stage(), Stage::Fetch);
    }

    #[tokio::test]
    async fn invalid_selector_fails_in_setup() {
        let mut config = Config::with_defaults();
        config.selectors.keyword = "a[".to_string();

        let err = scrape(&StaticPages::new(), &config, FailurePolicy::FailFast, &mut ())
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Stage::Setup);
    }

    #[tokio::test]
    async fn missing_listing_is_fatal_when_failing_fast() {
        let config = Config::with_defaults();
        let err = scrape(&StaticPages::new(), &config, FailurePolicy::FailFast, &mut ())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Fetch {
                season: 1,
                global_index: None,
                page: PageKind::Listing,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn missing_listings_are_skipped_when_configured() {
        let mut config = Config::with_defaults();
        config.source.seasons = 2;

        let outcome = scrape(
            &StaticPages::new(),
            &config,
            FailurePolicy::SkipAndContinue,
            &mut (),
        )
        .await
        .unwrap();

        assert!(outcome.records.is_empty());
        assert_eq!(outcome.missing.len(), 2);
        assert!(outcome
            .missing
            .iter()
            .all(|m| m.page == PageKind::Listing && m.global_index.is_none()));
    }
}
