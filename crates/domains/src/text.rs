//! Pure text helpers shared by entity saves: slug candidates and the
//! markup-free projection stored next to every localized draft.

use once_cell::sync::Lazy;
use regex::Regex;

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("static regex"));
static MARKUP_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("static regex"));

/// Lower-cases `title` and collapses every run of non-alphanumeric
/// characters into a single `-`. Leading and trailing separators are dropped.
pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    NON_ALNUM
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// Strips markup tags and normalizes whitespace to single spaces.
pub fn plain_text(html: &str) -> String {
    let stripped = MARKUP_TAG.replace_all(html, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
