//! Keyword pages.

use scraper::Html;

use super::fields::collapse_whitespace;
use super::Selectors;

/// Keywords in page order. A page without keyword elements yields an empty list.
pub fn parse_keywords(html: &str, selectors: &Selectors) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&selectors.keyword)
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|kw| !kw.is_empty())
        .collect()
}
