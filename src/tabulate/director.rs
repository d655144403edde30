//! Director credit clean-up.
//!
//! Credit blocks arrive as markup text with names split across lines and
//! padded with whitespace. Stripping every whitespace character and then
//! re-inserting a space at each lowercase-to-uppercase transition recovers
//! readable names in the common case. The transform is approximate: names
//! with internal capitals ("McArthur", "DeMille") are split, and two directors
//! credited together come back as one run of words.

use std::sync::LazyLock;

use regex::Regex;

static CASE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\p{Ll})(\p{Lu})").expect("valid regex"));

/// Remove all whitespace, including line breaks and non-breaking spaces.
pub fn compact(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Best-effort readable name from raw credit text. `None` if nothing remains.
pub fn normalize_director(raw: &str) -> Option<String> {
    let compacted = compact(raw);
    if compacted.is_empty() {
        return None;
    }
    Some(CASE_BOUNDARY.replace_all(&compacted, "$1 $2").into_owned())
}

/// Whether `name` occurs in the credit text, ignoring all whitespace on both sides.
///
/// `"Neil Marshall"` matches both `"Neil Marshall"` and `"NeilMarshall"`.
pub fn credit_mentions(raw: &str, name: &str) -> bool {
    let needle = compact(name);
    !needle.is_empty() && compact(raw).contains(&needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejoins_split_names() {
        assert_eq!(
            normalize_director("\n   Tim Van Patten\n  ").as_deref(),
            Some("Tim Van Patten")
        );
        assert_eq!(
            normalize_director("NeilMarshall").as_deref(),
            Some("Neil Marshall")
        );
        assert_eq!(
            normalize_director("Neil\u{a0}Marshall\r\n").as_deref(),
            Some("Neil Marshall")
        );
    }

    #[test]
    fn internal_capitals_are_mis_segmented() {
        assert_eq!(
            normalize_director("Daniel Minahan").as_deref(),
            Some("Daniel Minahan")
        );
        assert_eq!(
            normalize_director("Ruth McArthur").as_deref(),
            Some("Ruth Mc Arthur")
        );
    }

    #[test]
    fn whitespace_only_is_absent() {
        assert_eq!(normalize_director(" \n\t "), None);
        assert_eq!(normalize_director(""), None);
    }

    #[test]
    fn mentions_ignore_whitespace() {
        assert!(credit_mentions("\n Neil Marshall \n", "Neil Marshall"));
        assert!(credit_mentions("NeilMarshall", "Neil Marshall"));
        assert!(credit_mentions("Neil Marshall", "NeilMarshall"));
        assert!(!credit_mentions("Alan Taylor", "Neil Marshall"));
        assert!(!credit_mentions("Alan Taylor", "  "));
    }
}
