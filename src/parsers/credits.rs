//! Credits pages.

use scraper::Html;

use super::Selectors;

/// Raw text of the director credit block, untouched.
///
/// Returns `None` when the block is missing or contains only whitespace.
pub fn parse_credits(html: &str, selectors: &Selectors) -> Option<String> {
    let document = Html::parse_document(html);
    let block = document.select(&selectors.director_credit).next()?;
    let text: String = block.text().collect();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}
