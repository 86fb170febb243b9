//! Text cleanup for user-entered names, titles and tags.

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Trims and collapses internal whitespace runs to one space.
pub fn collapse_whitespace(value: &str) -> String {
    WHITESPACE_RE.replace_all(value.trim(), " ").into_owned()
}

/// Normalizes a subject name. Returns `None` when blank.
pub fn normalize_subject(value: &str) -> Option<String> {
    let normalized = collapse_whitespace(value);
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// Normalizes one tag. Returns `None` when blank.
pub fn normalize_tag(value: &str) -> Option<String> {
    normalize_subject(value)
}

/// Normalizes a tag list: blanks dropped, exact duplicates removed, first
/// occurrence order kept.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        if let Some(value) = normalize_tag(tag) {
            if !normalized.contains(&value) {
                normalized.push(value);
            }
        }
    }
    normalized
}
