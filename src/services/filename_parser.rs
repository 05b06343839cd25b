//! Attribute extractor for downloaded media file names
//!
//! Parses names like:
//! - "Avatar_2009.mp4"
//! - "Breaking.Bad.S01E01.ita.mp4"
//! - "One.Piece.E1001.ita.mp4"
//! - "Breaking Bad - s01e01 - Pilot {tmdb-1396}.mp4" (already renamed)
//!
//! Every pattern list is tried in order and the first match wins. Nothing here
//! fails: fields that cannot be read stay unset for the enricher to fill in.

use std::path::{Component, Path};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::text_utils::{LANGUAGE_CODES, collapse_whitespace, normalize_separators, strip_punctuation};
use crate::config::LibraryLayout;
use crate::media::{Classification, FileAttributes, MediaCategory};

/// Parent folder names that say nothing about the title
const GENERIC_FOLDERS: &[&str] = &["download", "downloads", "temp", "tmp"];

/// Folder names after which the series title folder follows
const ANCHOR_FOLDERS: &[&str] = &["serie", "series", "anime"];

static LANGUAGE_RE: Lazy<Regex> = Lazy::new(|| {
    let pattern = format!(r"(?i)[-_.\s]({})(?:[-_.\s]|$)", LANGUAGE_CODES.join("|"));
    Regex::new(&pattern).expect("language pattern is valid")
});

static SEASON_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^A-Za-z])[Ss](?:eason|tagione)?[-\s_.]*(\d{1,3})")
        .expect("season pattern is valid")
});

/// Episode patterns, most specific first
static EPISODE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // S01E01, E01, EP01 (the E must not end a word: "The 100")
        r"(?:^|[^A-Za-z])[Ee][Pp]?[-\s_.]*(\d{1,4})",
        r"_EP_(\d+)",
        // Bare separated number: "Naruto - 045"
        r"[-\s_.](\d{1,3})(?:[-\s_.]|$)",
        r"(?i)Ep(?:isode)?\s*(\d+)",
        r"(?i)Episodio\s*(\d+)",
        r"#(\d+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("episode pattern is valid"))
    .collect()
});

/// Season and episode tokens removed when the title comes from the file name
static SEASON_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[^a-z])s(?:eason|tagione)?[-\s_.]*\d{1,3}")
        .expect("season token pattern is valid")
});

static EPISODE_TOKEN_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)(?:^|[^a-z])(?:episodio|episode|ep|e)[-\s_.]*\d{1,4}",
        r"(?i)_ep_\d+",
        r"#\d+",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("episode token pattern is valid"))
    .collect()
});

/// `S1`, `Season 2`, `Stagione 3` folders
static SEASON_FOLDER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:s\d+|season\s*\d+|stagione\s*\d+)$").expect("season folder pattern is valid")
});

static CATALOG_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{tmdb-(\d+)\}").expect("catalog tag pattern is valid"));

static BRACE_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\{[^}]*\}").expect("brace tag pattern is valid"));

static PAREN_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\((?:19|20)\d{2}\)").expect("paren year pattern is valid"));

static PAREN_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\([^)]*\)").expect("paren tag pattern is valid"));

static YEAR_DIGITS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:19|20)\d{2}").expect("year digits pattern is valid"));

static PARENT_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(((?:19|20)\d{2})\)").expect("parent year pattern is valid"));

static TRAILING_YEAR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.*?)\s*\(((?:19|20)\d{2})\)\s*$").expect("trailing year pattern is valid")
});

/// Names produced by this crate: `Title - s01e01[ - Episode][ {tmdb-N}]`
static CANONICAL_EPISODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<title>.+?) - [sS](?P<season>\d{1,3})[eE](?P<episode>\d{1,4})(?: - (?P<episode_title>.+?))?(?: \{tmdb-\d+\})?$",
    )
    .expect("canonical episode pattern is valid")
});

/// Reads descriptive attributes out of a file path
pub struct AttributeExtractor {
    anchors: Vec<String>,
    root_path: std::path::PathBuf,
}

impl AttributeExtractor {
    pub fn new(layout: &LibraryLayout) -> Self {
        let mut anchors: Vec<String> = ANCHOR_FOLDERS.iter().map(|a| a.to_string()).collect();
        for folder in [&layout.series_folder, &layout.anime_folder] {
            for segment in normal_segments(Path::new(folder)) {
                let segment = segment.to_lowercase();
                if !anchors.contains(&segment) {
                    anchors.push(segment);
                }
            }
        }

        Self {
            anchors,
            root_path: layout.root_path.clone(),
        }
    }

    /// Extract attributes for a classified file.
    ///
    /// A catalog id bound by the classifier is carried over unchanged; a
    /// `{tmdb-N}` tag in the name only fills it when none was bound.
    pub fn extract(&self, path: &Path, classification: &Classification) -> FileAttributes {
        let category = classification.category;
        let raw_stem = file_stem(path);
        let parent = parent_name(path);

        let mut attrs = FileAttributes {
            catalog_id: classification.catalog_id,
            ..FileAttributes::default()
        };
        if let Some(id) = catalog_tag(&raw_stem) {
            attrs.bind_catalog_id(id);
        }

        let stem = BRACE_TAG_RE.replace_all(&raw_stem, "").trim().to_string();
        attrs.language = detect_language(&stem);

        if category.is_series() {
            self.extract_series(path, &stem, &parent, category, &mut attrs);
        } else {
            attrs.title = Some(movie_title(&stem)).filter(|t| !t.is_empty()).or_else(|| {
                Some(parent.clone()).filter(|p| !p.is_empty())
            });
            attrs.year = movie_year(&parent, &stem);
        }

        debug!(
            path = %path.display(),
            category = %category,
            title = ?attrs.title,
            year = ?attrs.year,
            season = ?attrs.season,
            episode = ?attrs.episode,
            language = ?attrs.language,
            catalog_id = ?attrs.catalog_id,
            "Extracted file attributes"
        );
        attrs
    }

    fn extract_series(
        &self,
        path: &Path,
        stem: &str,
        parent: &str,
        category: MediaCategory,
        attrs: &mut FileAttributes,
    ) {
        let (path_title, path_year) = self.title_from_path(path, parent);
        attrs.year = path_year;

        if let Some(caps) = CANONICAL_EPISODE_RE.captures(stem) {
            attrs.title = Some(caps["title"].trim().to_string());
            attrs.season = caps["season"].parse().ok();
            attrs.episode = caps["episode"].parse().ok();
            attrs.episode_title = caps.name("episode_title").map(|m| m.as_str().to_string());
            return;
        }

        attrs.season = find_season(parent).or_else(|| find_season(stem));
        if attrs.season.is_none() && category.is_anime() {
            attrs.season = Some(1);
        }
        attrs.episode = find_episode(stem);

        let generic_parent = GENERIC_FOLDERS.contains(&parent.to_lowercase().as_str());
        let from_name = if generic_parent || category.is_anime() {
            Some(title_from_file_name(stem, attrs)).filter(|t| !t.is_empty())
        } else {
            None
        };
        attrs.title = from_name.or(path_title);
    }

    /// Series title from the folder that follows a `Serie`/`Anime` style anchor.
    ///
    /// Falls back to the parent folder when no anchor exists or the folder after
    /// it is a season folder. A trailing `(YYYY)` becomes the year.
    fn title_from_path(&self, path: &Path, parent: &str) -> (Option<String>, Option<String>) {
        let relative = path.strip_prefix(&self.root_path).unwrap_or(path);
        let segments = normal_segments(relative);
        let folders = &segments[..segments.len().saturating_sub(1)];

        let is_anchor = |s: &String| self.anchors.contains(&s.to_lowercase());
        let candidate = folders
            .iter()
            .position(is_anchor)
            .and_then(|start| folders[start..].iter().find(|s| !is_anchor(*s)))
            .filter(|s| !SEASON_FOLDER_RE.is_match(s))
            .map(String::as_str)
            .unwrap_or(parent);

        if candidate.is_empty() {
            return (None, None);
        }
        match TRAILING_YEAR_RE.captures(candidate) {
            Some(caps) => (Some(caps[1].to_string()), Some(caps[2].to_string())),
            None => (Some(candidate.to_string()), None),
        }
    }
}

fn normal_segments(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn parent_name(path: &Path) -> String {
    path.parent()
        .and_then(|p| p.file_name())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn catalog_tag(stem: &str) -> Option<u64> {
    CATALOG_TAG_RE
        .captures(stem)
        .and_then(|caps| caps[1].parse().ok())
}

/// First known language code wrapped by separators, lowercased.
pub fn detect_language(stem: &str) -> Option<String> {
    LANGUAGE_RE
        .captures(stem)
        .map(|caps| caps[1].to_lowercase())
}

pub fn find_season(text: &str) -> Option<u32> {
    SEASON_RE
        .captures(text)
        .and_then(|caps| caps[1].parse().ok())
}

/// Episode number from the first pattern that matches.
pub fn find_episode(stem: &str) -> Option<u32> {
    EPISODE_PATTERNS
        .iter()
        .find_map(|re| re.captures(stem))
        .and_then(|caps| caps[1].parse().ok())
}

/// Movie title: parenthesised tags out, cut at the release year, separators trimmed.
///
/// A `(YYYY)` tag already marks the year, so numbers left in the title are part
/// of it ("Blade Runner 2049 (2017)"). Without one, the name is cut at the last
/// standalone year, unless that year is the whole title.
pub fn movie_title(stem: &str) -> String {
    let has_paren_year = PAREN_YEAR_RE.is_match(stem);
    let without_year = PAREN_YEAR_RE.replace_all(stem, "");
    let mut title = PAREN_TAG_RE.replace_all(&without_year, "").to_string();
    if !has_paren_year {
        if let Some((start, _)) = last_year_token(&title) {
            if start > 0 {
                title.truncate(start);
            }
        }
    }
    title
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '_' | '.'))
        .to_string()
}

/// Year from `(YYYY)` in the parent folder or the name, otherwise the last
/// standalone year in the name.
pub fn movie_year(parent: &str, stem: &str) -> Option<String> {
    PARENT_YEAR_RE
        .captures(parent)
        .or_else(|| PARENT_YEAR_RE.captures(stem))
        .map(|caps| caps[1].to_string())
        .or_else(|| last_year_token(stem).map(|(_, year)| year.to_string()))
}

fn is_year_boundary(c: char) -> bool {
    c.is_whitespace() || matches!(c, '_' | '.' | '-' | '(' | ')' | '[' | ']')
}

/// Byte offset and text of the last year that stands alone between separators.
fn last_year_token(text: &str) -> Option<(usize, &str)> {
    YEAR_DIGITS_RE
        .find_iter(text)
        .filter(|m| {
            let before = text[..m.start()].chars().next_back().is_none_or(is_year_boundary);
            let after = text[m.end()..].chars().next().is_none_or(is_year_boundary);
            before && after
        })
        .last()
        .map(|m| (m.start(), m.as_str()))
}

/// Series title left in the file name once season, episode and language are removed.
fn title_from_file_name(stem: &str, attrs: &FileAttributes) -> String {
    let mut text = stem.to_string();
    if attrs.season.is_some() {
        text = SEASON_TOKEN_RE.replace_all(&text, " ").into_owned();
    }
    if attrs.episode.is_some() {
        for re in EPISODE_TOKEN_RES.iter() {
            text = re.replace_all(&text, " ").into_owned();
        }
    }
    if attrs.language.is_some() {
        text = LANGUAGE_RE.replace_all(&text, " ").into_owned();
    }

    let cleaned = strip_punctuation(&normalize_separators(&text));
    // A bare episode number ("Naruto - 045") survives the token patterns
    let words: Vec<&str> = cleaned
        .split_whitespace()
        .filter(|w| match (w.parse::<u32>(), attrs.episode) {
            (Ok(n), Some(ep)) => n != ep,
            _ => true,
        })
        .collect();
    collapse_whitespace(&words.join(" "))
}
