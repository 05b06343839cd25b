//! Media classifier
//!
//! Decides which library branch a downloaded file belongs to. Steps run in a
//! fixed order and the first decisive one wins:
//!
//! 1. the configured folder taxonomy under the library root
//! 2. a catalog lookup (movie and series searched concurrently)
//! 3. lists of well-known anime titles
//! 4. path and filename cues
//!
//! When nothing decides, [`UNDETERMINED_FALLBACK`] is returned so the pipeline
//! always makes progress.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use super::catalog::{Catalog, looks_like_anime};
use super::text_utils::{candidate_title, compact, with_year};
use crate::config::LibraryLayout;
use crate::media::{Classification, ClassificationSource, MediaCategory, UNDETERMINED_FALLBACK};

/// Well-known anime films, matched against the separator-stripped file name
const KNOWN_ANIME_MOVIES: &[&str] = &[
    "your name",
    "weathering with you",
    "spirited away",
    "princess mononoke",
    "howl moving castle",
    "akira",
    "ghost in the shell",
    "a silent voice",
    "grave of the fireflies",
    "my neighbor totoro",
    "promare",
    "jujutsu kaisen 0",
];

/// Well-known anime series, matched the same way
const KNOWN_ANIME_SERIES: &[&str] = &[
    "demon slayer",
    "one piece",
    "naruto",
    "attack on titan",
    "boku no hero",
    "my hero",
    "dragon ball",
    "hunter x hunter",
    "death note",
    "sword art",
    "fullmetal",
    "jujutsu kaisen",
    "pokemon",
    "digimon",
    "bleach",
    "chainsaw man",
];

const ANIME_NAME_KEYWORDS: &[&str] = &["anime", "japan", "jap", "jpn"];

static SERIES_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:^|[^a-z])s\d{1,3}(?:e\d+)?(?:[^a-z\d]|$)|stagione|season|_ep_|episodio|episode",
    )
    .expect("series cue pattern is valid")
});

/// Which kind of catalog hit won the popularity comparison
#[derive(Debug, Clone, Copy)]
enum CatalogPick {
    Movie(u64),
    Series(u64),
}

/// Assigns a [`MediaCategory`] to a file path
pub struct MediaClassifier {
    layout: LibraryLayout,
    catalog: Option<Arc<dyn Catalog>>,
}

impl MediaClassifier {
    pub fn new(layout: LibraryLayout, catalog: Option<Arc<dyn Catalog>>) -> Self {
        Self { layout, catalog }
    }

    /// Classify a file. Never fails: catalog errors count as "no hit".
    pub async fn classify(&self, path: &Path) -> Classification {
        if let Some(found) = self.from_taxonomy(path) {
            debug!(path = %path.display(), category = %found.category, "Classified by folder taxonomy");
            return found;
        }

        if let Some(catalog) = &self.catalog {
            if let Some(found) = identify_via_catalog(catalog.as_ref(), path).await {
                info!(
                    path = %path.display(),
                    category = %found.category,
                    catalog_id = ?found.catalog_id,
                    "Classified by catalog lookup"
                );
                return found;
            }
        }

        let found = classify_by_heuristics(path, &self.layout.root_path);
        info!(
            path = %path.display(),
            category = %found.category,
            source = ?found.source,
            "Classified without catalog"
        );
        found
    }

    /// Match the first relative segment(s) against the configured category folders.
    pub fn from_taxonomy(&self, path: &Path) -> Option<Classification> {
        let layout = &self.layout;
        let relative = path.strip_prefix(&layout.root_path).ok()?;

        let mut components = relative.components();
        if layout.add_site_name {
            components.next()?;
        }
        // The category folder must sit above the file itself
        let folders: PathBuf = components.as_path().parent()?.to_path_buf();
        if folders.as_os_str().is_empty() {
            return None;
        }

        let anime = Path::new(&layout.anime_folder);
        let taxonomy = |category| Some(Classification::new(category, ClassificationSource::Taxonomy));

        if let Some(folder) = &layout.anime_movie_folder {
            if folders.starts_with(folder) {
                return taxonomy(MediaCategory::AnimeMovie);
            }
        }
        if let Ok(below_anime) = folders.strip_prefix(anime) {
            match first_segment(below_anime).map(|s| s.to_lowercase()).as_deref() {
                Some("film") => return taxonomy(MediaCategory::AnimeMovie),
                Some("serie") | Some("series") => return taxonomy(MediaCategory::AnimeSeries),
                _ if layout.anime_folder_implies_series() => {
                    return taxonomy(MediaCategory::AnimeSeries);
                }
                _ => {}
            }
        }
        if folders.starts_with(&layout.movie_folder) {
            return taxonomy(MediaCategory::Movie);
        }
        if folders.starts_with(&layout.series_folder) {
            return taxonomy(MediaCategory::Series);
        }
        None
    }
}

fn first_segment(path: &Path) -> Option<String> {
    path.components().find_map(|c| match c {
        Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
        _ => None,
    })
}

/// Search the catalog as movie and as series and keep the more popular top hit.
async fn identify_via_catalog(catalog: &dyn Catalog, path: &Path) -> Option<Classification> {
    let file_name = path.file_name()?.to_string_lossy();
    let (title, year) = candidate_title(&file_name);
    if title.is_empty() {
        return None;
    }
    let query = with_year(&title, year.as_deref());
    debug!(query = %query, "Identifying media type via catalog");

    let (movies, series) = tokio::join!(catalog.search_movie(&query), catalog.search_series(&query));
    let movies = movies.unwrap_or_else(|e| {
        warn!(query = %query, error = %e, "Catalog movie search failed");
        Vec::new()
    });
    let series = series.unwrap_or_else(|e| {
        warn!(query = %query, error = %e, "Catalog series search failed");
        Vec::new()
    });

    let pick = match (movies.first(), series.first()) {
        (Some(movie), Some(show)) if show.popularity > movie.popularity => {
            CatalogPick::Series(show.id)
        }
        (Some(movie), _) => CatalogPick::Movie(movie.id),
        (None, Some(show)) => CatalogPick::Series(show.id),
        (None, None) => {
            debug!(query = %query, "No catalog hits");
            return None;
        }
    };

    let (is_series, id, is_anime) = match pick {
        CatalogPick::Movie(id) => {
            let (id, is_anime) = movie_traits(catalog, id).await;
            (false, id, is_anime)
        }
        CatalogPick::Series(id) => {
            let (id, is_anime) = series_traits(catalog, id).await;
            (true, id, is_anime)
        }
    };

    Some(
        Classification::new(
            MediaCategory::from_flags(is_series, is_anime),
            ClassificationSource::Catalog,
        )
        .with_catalog_id(id),
    )
}

/// Detail id and anime flag for a movie hit. A failed detail call keeps the hit id.
async fn movie_traits(catalog: &dyn Catalog, id: u64) -> (u64, bool) {
    match catalog.movie_detail(id).await {
        Ok(detail) => {
            let keywords = catalog.movie_keywords(id).await.unwrap_or_else(|e| {
                warn!(catalog_id = id, error = %e, "Failed to fetch movie keywords");
                Vec::new()
            });
            let anime = looks_like_anime(&detail.production_countries, &detail.genres, &keywords);
            (detail.id, anime)
        }
        Err(e) => {
            warn!(catalog_id = id, error = %e, "Failed to fetch movie details");
            (id, false)
        }
    }
}

async fn series_traits(catalog: &dyn Catalog, id: u64) -> (u64, bool) {
    match catalog.series_detail(id).await {
        Ok(detail) => {
            let keywords = catalog.series_keywords(id).await.unwrap_or_else(|e| {
                warn!(catalog_id = id, error = %e, "Failed to fetch series keywords");
                Vec::new()
            });
            let anime = looks_like_anime(&detail.origin_country, &detail.genres, &keywords);
            (detail.id, anime)
        }
        Err(e) => {
            warn!(catalog_id = id, error = %e, "Failed to fetch series details");
            (id, false)
        }
    }
}

/// Known titles first, then path and filename cues, then the fallback policy.
pub fn classify_by_heuristics(path: &Path, root: &Path) -> Classification {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let compact_name = compact(&file_name);

    let known = |names: &[&str]| names.iter().any(|n| compact_name.contains(&compact(n)));

    if known(KNOWN_ANIME_MOVIES) {
        return Classification::new(MediaCategory::AnimeMovie, ClassificationSource::KnownTitle);
    }

    // Only folders below the root count, so a root named "anime" decides nothing
    let folders: Vec<String> = path
        .parent()
        .map(|p| p.strip_prefix(root).unwrap_or(p))
        .map(|p| {
            p.components()
                .filter_map(|c| match c {
                    Component::Normal(s) => Some(s.to_string_lossy().to_lowercase()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    let known_series = known(KNOWN_ANIME_SERIES);
    let anime_path = folders.iter().any(|f| f == "anime");
    let anime_name = ANIME_NAME_KEYWORDS.iter().any(|k| file_name.contains(k));
    let series_path = folders.iter().any(|f| f == "serie" || f == "series");
    let series_name = SERIES_NAME_RE.is_match(&file_name);

    let is_anime = known_series || anime_path || anime_name;
    let is_series = series_path || series_name;

    if !is_anime && !is_series {
        return Classification::new(UNDETERMINED_FALLBACK, ClassificationSource::Fallback);
    }

    let source = if known_series && !anime_path && !anime_name {
        ClassificationSource::KnownTitle
    } else {
        ClassificationSource::Heuristic
    };
    Classification::new(MediaCategory::from_flags(is_series, is_anime), source)
}
