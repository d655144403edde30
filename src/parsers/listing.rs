//! Season listing pages: one row per episode.

use chrono::NaiveDate;
use scraper::{ElementRef, Html};
use tracing::warn;

use super::fields::{collapse_whitespace, parse_air_date, parse_rating};
use super::{ParseError, Selectors};

/// One episode as it appears on a season listing page.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingRow {
    pub title: String,
    pub episode_in_season: u32,
    pub synopsis: String,
    pub rating: Option<f64>,
    pub air_date: Option<NaiveDate>,
    /// Link to the episode page as written in the markup (usually relative).
    pub link: String,
}

/// Parse every episode row on a season listing page.
///
/// Rows come back in page order. An unparseable rating or air date becomes
/// `None`; a missing title, link or episode number is a structural error.
pub fn parse_listing(html: &str, selectors: &Selectors) -> Result<Vec<ListingRow>, ParseError> {
    let document = Html::parse_document(html);
    let mut rows = Vec::new();

    for (position, item) in document.select(&selectors.episode_item).enumerate() {
        rows.push(parse_row(item, position + 1, selectors)?);
    }

    if rows.is_empty() {
        return Err(ParseError::EmptyListing);
    }

    Ok(rows)
}

fn parse_row(item: ElementRef<'_>, row: usize, selectors: &Selectors) -> Result<ListingRow, ParseError> {
    let anchor = item
        .select(&selectors.title_link)
        .next()
        .ok_or(ParseError::Structural { row, field: "title" })?;

    let title = collapse_whitespace(&anchor.text().collect::<String>());
    if title.is_empty() {
        return Err(ParseError::Structural { row, field: "title" });
    }

    let link = anchor
        .value()
        .attr("href")
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .ok_or(ParseError::Structural { row, field: "link" })?
        .to_string();

    let episode_in_season = parse_episode_number(item, row, selectors)?;

    let synopsis = first_text(item, &selectors.synopsis).unwrap_or_default();

    let rating = first_text(item, &selectors.rating).and_then(|text| parse_rating(&text));

    let air_date = match first_text(item, &selectors.air_date) {
        Some(text) => match parse_air_date(&text) {
            Ok(date) => Some(date),
            Err(e) => {
                warn!("Listing row {} ({}): {}", row, title, e);
                None
            }
        },
        None => None,
    };

    Ok(ListingRow {
        title,
        episode_in_season,
        synopsis,
        rating,
        air_date,
        link,
    })
}

/// Episode number from a `content` attribute (microdata) or the element text.
fn parse_episode_number(
    item: ElementRef<'_>,
    row: usize,
    selectors: &Selectors,
) -> Result<u32, ParseError> {
    let element = item
        .select(&selectors.episode_number)
        .next()
        .ok_or(ParseError::Structural {
            row,
            field: "episode number",
        })?;

    let raw = match element.value().attr("content") {
        Some(content) => content.trim().to_string(),
        None => collapse_whitespace(&element.text().collect::<String>()),
    };

    match raw.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ParseError::EpisodeNumber { row, value: raw }),
    }
}

/// Collapsed text of the first element matching `selector`, if any.
fn first_text(item: ElementRef<'_>, selector: &scraper::Selector) -> Option<String> {
    item.select(selector)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
}
