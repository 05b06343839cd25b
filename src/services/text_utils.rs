//! Title normalization shared by the classifier, the extractor and the enricher
//!
//! Turns raw filename or folder fragments into search-safe title strings.

use once_cell::sync::Lazy;
use regex::Regex;

/// Short language codes recognised as filename tags
pub const LANGUAGE_CODES: &[&str] = &[
    "ita", "eng", "jpn", "jap", "spa", "esp", "fra", "fre", "ger", "deu", "por", "rus", "kor",
    "chi",
];

/// Language and audio tags dropped from search queries (`-ita`, `_sub`, ` dubbed`)
static LANGUAGE_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[-_.\s](?:ita|eng|jpn|jap|sub|dub)(?:bed)?(?:[-_.\s]|$)")
        .expect("language tag pattern is valid")
});

/// `S01E01` style markers
static EPISODE_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)s\d+e\d+").expect("episode marker pattern is valid"));

static YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:19|20)\d{2}").expect("year pattern is valid"));

static NON_WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s]").expect("punctuation pattern is valid"));

/// Collapse runs of whitespace into single spaces and trim.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Replace `.`, `-` and `_` separators with spaces.
pub fn normalize_separators(s: &str) -> String {
    collapse_whitespace(&s.replace(['.', '-', '_'], " "))
}

/// Remove language/audio tags such as `-ita` or `_subbed`.
///
/// Tags are replaced by a space so the words around them never fuse.
pub fn strip_language_tags(s: &str) -> String {
    // A tag can consume the separator the next tag needs, so run until stable.
    let mut current = s.to_string();
    loop {
        let next = LANGUAGE_TAG_RE.replace_all(&current, " ").to_string();
        if next == current {
            return collapse_whitespace(&next);
        }
        current = next;
    }
}

/// Replace every non-word, non-space character with a space and collapse.
pub fn strip_punctuation(s: &str) -> String {
    collapse_whitespace(&NON_WORD_RE.replace_all(s, " "))
}

/// Search query for a series: language tags out, separators normalized.
pub fn series_search_title(title: &str) -> String {
    normalize_separators(&strip_language_tags(title))
}

/// Cleaned movie title used by the first search strategy.
pub fn clean_title(title: &str) -> String {
    normalize_separators(&strip_language_tags(title))
}

/// First `n` whitespace separated words.
pub fn first_words(s: &str, n: usize) -> String {
    s.split_whitespace().take(n).collect::<Vec<_>>().join(" ")
}

/// Lowercase and drop every separator, for substring matching against known titles.
pub fn compact(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '-' | '_' | '.' | ' '))
        .collect()
}

/// First plausible release year (`19xx`/`20xx`) in a string.
pub fn find_year(s: &str) -> Option<String> {
    YEAR_RE.find(s).map(|m| m.as_str().to_string())
}

/// Derive a candidate search title from a bare filename (with extension).
///
/// Returns the lowercase title and the first year found in the name. The year is
/// removed from the title so it is not searched twice.
pub fn candidate_title(file_name: &str) -> (String, Option<String>) {
    let lower = file_name.to_lowercase();
    let stem = match lower.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.len() <= 4 => stem.to_string(),
        _ => lower.clone(),
    };

    let year = find_year(&stem);
    let without_markers = EPISODE_MARKER_RE.replace_all(&stem, " ").to_string();
    let without_tags = strip_language_tags(&without_markers);
    let mut title = normalize_separators(&without_tags);
    if let Some(y) = &year {
        let stripped = collapse_whitespace(&title.replace(y.as_str(), " "));
        if !stripped.is_empty() {
            title = stripped;
        }
    }

    (title, year)
}

/// Catalog query: title followed by the year when known.
pub fn with_year(title: &str, year: Option<&str>) -> String {
    match year {
        Some(y) if !title.is_empty() => format!("{} {}", title, y),
        _ => title.to_string(),
    }
}
