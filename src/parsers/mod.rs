//! Parsers for season listings, keyword pages and credits pages.
//!
//! Optional fields that cannot be parsed become `None`. Structural fields
//! (title, episode number, episode link) are fatal: their absence means the
//! page layout changed and nothing downstream can be trusted.

mod credits;
mod fields;
mod keywords;
mod listing;

pub use credits::parse_credits;
pub use fields::{collapse_whitespace, parse_air_date, parse_rating, AIR_DATE_FORMAT};
pub use keywords::parse_keywords;
pub use listing::{parse_listing, ListingRow};

use scraper::Selector;
use thiserror::Error;

use crate::config::SelectorConfig;

/// Errors raised while parsing page markup.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Invalid CSS selector for {name} ({selector}): {reason}")]
    Selector {
        name: &'static str,
        selector: String,
        reason: String,
    },

    #[error("Listing row {row}: missing {field} (page layout changed?)")]
    Structural { row: usize, field: &'static str },

    #[error("Listing row {row}: episode number {value:?} is not a positive integer")]
    EpisodeNumber { row: usize, value: String },

    #[error("Air date {value:?} does not match format {format}")]
    AirDate { value: String, format: &'static str },

    #[error("Listing page contains no episodes")]
    EmptyListing,
}

/// Compiled selectors for all page kinds.
#[derive(Debug, Clone)]
pub struct Selectors {
    pub episode_item: Selector,
    pub title_link: Selector,
    pub episode_number: Selector,
    pub air_date: Selector,
    pub rating: Selector,
    pub synopsis: Selector,
    pub keyword: Selector,
    pub director_credit: Selector,
}

impl Selectors {
    /// Compile every selector, failing on the first invalid one.
    pub fn compile(config: &SelectorConfig) -> Result<Self, ParseError> {
        Ok(Self {
            episode_item: compile_one("episode_item", &config.episode_item)?,
            title_link: compile_one("title_link", &config.title_link)?,
            episode_number: compile_one("episode_number", &config.episode_number)?,
            air_date: compile_one("air_date", &config.air_date)?,
            rating: compile_one("rating", &config.rating)?,
            synopsis: compile_one("synopsis", &config.synopsis)?,
            keyword: compile_one("keyword", &config.keyword)?,
            director_credit: compile_one("director_credit", &config.director_credit)?,
        })
    }
}

fn compile_one(name: &'static str, selector: &str) -> Result<Selector, ParseError> {
    Selector::parse(selector).map_err(|e| ParseError::Selector {
        name,
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}
