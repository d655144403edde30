//! Episode records and the character presence mapping.
//!
//! One `EpisodeRecord` is built per scraped episode. Fetched fields come from
//! the season listing, keyword and credits pages; derived fields are computed
//! by the tabulator, at scrape time and again whenever a saved table is loaded
//! for analysis.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Kind of page fetched for an episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    Listing,
    Keywords,
    Credits,
}

impl PageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Listing => "listing",
            Self::Keywords => "keywords",
            Self::Credits => "credits",
        }
    }
}

impl std::fmt::Display for PageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered mapping from roster key to whether that character was detected.
///
/// Order follows the roster the mapping was built from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterPresence {
    entries: Vec<(String, bool)>,
}

impl CharacterPresence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record presence for a key. A repeated key overwrites the earlier flag.
    pub fn insert(&mut self, key: impl Into<String>, present: bool) {
        let key = key.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = present;
        } else {
            self.entries.push((key, present));
        }
    }

    pub fn get(&self, key: &str) -> Option<bool> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, present)| *present)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Number of characters flagged present.
    pub fn count_present(&self) -> u32 {
        self.entries.iter().filter(|(_, present)| *present).count() as u32
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, bool)> for CharacterPresence {
    fn from_iter<I: IntoIterator<Item = (String, bool)>>(iter: I) -> Self {
        let mut presence = Self::new();
        for (key, present) in iter {
            presence.insert(key, present);
        }
        presence
    }
}

/// One row of the episode table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    /// Season number (1-based).
    pub season: u32,
    /// Episode number within its season.
    pub episode_in_season: u32,
    /// Position in overall scrape order, contiguous from 1.
    pub global_index: u32,
    pub title: String,
    /// Synopsis snippet from the listing page, possibly empty.
    pub synopsis: String,
    /// Keywords in page order. `None` when the keyword page could not be fetched.
    pub keywords: Option<Vec<String>>,
    /// Audience rating in [0, 10]; `None` when missing or unparseable.
    pub rating: Option<f64>,
    pub air_date: Option<NaiveDate>,
    /// Raw director credit text. `None` when the credits page could not be fetched.
    pub director_credit_text: Option<String>,
    /// Absolute URL of the episode page.
    pub link: String,

    /// Best-effort readable director name recovered from the credit text.
    pub director: Option<String>,
    pub presence: CharacterPresence,
    pub character_score: u32,
    pub departed_from_source: bool,
    /// `None` when there is no credit text to check.
    pub outside_director: Option<bool>,
}

impl EpisodeRecord {
    /// Keywords, or an empty slice when the keyword page was missing.
    pub fn keyword_slice(&self) -> &[String] {
        self.keywords.as_deref().unwrap_or(&[])
    }

    pub fn is_rated(&self) -> bool {
        self.rating.is_some()
    }
}
