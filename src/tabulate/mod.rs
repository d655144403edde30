//! Assembly of parsed pages into the episode table.
//!
//! The tabulator owns no state between runs: it takes every scraped episode
//! in scrape order and returns a fresh table with global indices and derived
//! columns filled in.

mod director;

pub use director::{compact, credit_mentions, normalize_director};

use std::collections::HashSet;

use thiserror::Error;

use crate::config::{Config, RosterEntry};
use crate::models::{CharacterPresence, EpisodeRecord};
use crate::parsers::ListingRow;

/// Errors raised while assembling or checking the table.
#[derive(Debug, Error)]
pub enum TabulateError {
    #[error("Season {season} lists episode {episode} more than once")]
    DuplicateEpisode { season: u32, episode: u32 },

    #[error("Row {row}: expected global index {expected}, found {found}")]
    IndexGap { row: usize, expected: u32, found: u32 },

    #[error("Episode #{global_index}: character score {score} but {flags} flags set")]
    ScoreMismatch {
        global_index: u32,
        score: u32,
        flags: u32,
    },
}

/// Parser output for one episode, before derived fields exist.
#[derive(Debug, Clone)]
pub struct ScrapedEpisode {
    pub season: u32,
    pub row: ListingRow,
    /// Absolute episode URL.
    pub link: String,
    /// `None` when the keyword page could not be fetched.
    pub keywords: Option<Vec<String>>,
    /// `None` when the credits page could not be fetched or had no director block.
    pub credit_text: Option<String>,
}

/// Builds `EpisodeRecord`s and their derived columns.
#[derive(Debug, Clone)]
pub struct Tabulator<'a> {
    roster: &'a [RosterEntry],
    cutoff: u32,
    showrunner: &'a str,
}

impl<'a> Tabulator<'a> {
    pub fn new(roster: &'a [RosterEntry], cutoff: u32, showrunner: &'a str) -> Self {
        Self {
            roster,
            cutoff,
            showrunner,
        }
    }

    /// Tabulator for the roster, cutoff and showrunner of a config.
    pub fn from_config(config: &'a Config) -> Self {
        Self::new(
            &config.roster,
            config.analysis.cutoff,
            &config.analysis.showrunner,
        )
    }

    /// Assemble the table. Global indices follow input order, starting at 1.
    pub fn tabulate(
        &self,
        episodes: Vec<ScrapedEpisode>,
    ) -> Result<Vec<EpisodeRecord>, TabulateError> {
        let mut seen = HashSet::new();
        let mut records = Vec::with_capacity(episodes.len());

        for (position, episode) in episodes.into_iter().enumerate() {
            if !seen.insert((episode.season, episode.row.episode_in_season)) {
                return Err(TabulateError::DuplicateEpisode {
                    season: episode.season,
                    episode: episode.row.episode_in_season,
                });
            }
            records.push(self.build_record(episode, position as u32 + 1));
        }

        Ok(records)
    }

    /// Recompute every derived column from the fetched fields.
    ///
    /// A table read back from disk carries the columns derived under the
    /// config in force when it was scraped.
    pub fn rederive(&self, records: &mut [EpisodeRecord]) {
        for record in records.iter_mut() {
            self.derive(record);
        }
    }

    fn build_record(&self, episode: ScrapedEpisode, global_index: u32) -> EpisodeRecord {
        let ScrapedEpisode {
            season,
            row,
            link,
            keywords,
            credit_text,
        } = episode;

        let mut record = EpisodeRecord {
            season,
            episode_in_season: row.episode_in_season,
            global_index,
            title: row.title,
            synopsis: row.synopsis,
            keywords,
            rating: row.rating,
            air_date: row.air_date,
            director_credit_text: credit_text,
            link,
            director: None,
            presence: CharacterPresence::new(),
            character_score: 0,
            departed_from_source: false,
            outside_director: None,
        };
        self.derive(&mut record);
        record
    }

    fn derive(&self, record: &mut EpisodeRecord) {
        record.presence = detect_presence(&record.synopsis, self.roster);
        record.character_score = record.presence.count_present();
        let credit = record.director_credit_text.as_deref();
        record.director = credit.and_then(normalize_director);
        record.outside_director = credit.map(|text| !credit_mentions(text, self.showrunner));
        record.departed_from_source = departed_from_source(record.global_index, self.cutoff);
    }
}

/// Check the table invariants: indices run 1..N in order, episode numbers are
/// unique per season, and every character score matches its flags.
pub fn verify_table(records: &[EpisodeRecord]) -> Result<(), TabulateError> {
    let mut seen = HashSet::new();
    for (row, record) in records.iter().enumerate() {
        let expected = row as u32 + 1;
        if record.global_index != expected {
            return Err(TabulateError::IndexGap {
                row: row + 1,
                expected,
                found: record.global_index,
            });
        }
        if !seen.insert((record.season, record.episode_in_season)) {
            return Err(TabulateError::DuplicateEpisode {
                season: record.season,
                episode: record.episode_in_season,
            });
        }
        let flags = record.presence.count_present();
        if record.character_score != flags {
            return Err(TabulateError::ScoreMismatch {
                global_index: record.global_index,
                score: record.character_score,
                flags,
            });
        }
    }
    Ok(())
}

/// Case-sensitive substring search of every roster pattern in the synopsis.
///
/// This is plain `contains`, not word matching: a pattern `"Sam"` is found
/// inside `"Samwise"` or `"Samantha"`.
pub fn detect_presence(synopsis: &str, roster: &[RosterEntry]) -> CharacterPresence {
    roster
        .iter()
        .map(|entry| (entry.key(), synopsis.contains(entry.pattern())))
        .collect()
}

/// Whether an episode lies past the source-material cutoff.
pub fn departed_from_source(global_index: u32, cutoff: u32) -> bool {
    global_index > cutoff
}
